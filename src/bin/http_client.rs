use std::sync::mpsc;
use std::{env, process};
use tandem_http::{HeaderMap, HttpRequest, Method, RequestSender, Version};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: http_client <address> <port> <url>");
        process::exit(1);
    }

    if let Err(error) = run(&args) {
        eprintln!("error: {error}");
        process::exit(2);
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let address = args[1].clone();
    let port: u16 = args[2].parse()?;
    let url = args[3].clone();

    let request = HttpRequest::new(
        Method::Get,
        url,
        Version::default(),
        HeaderMap::new(),
        Vec::new(),
    );
    println!("{}", String::from_utf8_lossy(&request.pack_to_bytes()));

    let mut sender = RequestSender::new(address, port, std::time::Duration::from_secs(60))?;
    let (reply, outcome) = mpsc::channel();
    sender.send_request(
        &request,
        move |response| {
            let _ = reply.send(response);
        },
        None,
        None,
        None,
    );

    // The handler runs exactly once, so this receive always completes.
    match outcome.recv()? {
        Some(response) => println!("{}", String::from_utf8_lossy(&response.pack_to_bytes())),
        None => eprintln!("request failed"),
    }

    sender.stop();
    Ok(())
}
