use std::{env, process};
use tandem_http::{Server, StaticFiles};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 5 {
        eprintln!("Usage: http_server <address> <port> <threads> <doc_root>");
        process::exit(1);
    }

    if let Err(error) = run(&args) {
        eprintln!("error: {error}");
        process::exit(2);
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let address = &args[1];
    let port: u16 = args[2].parse()?;
    let threads: usize = args[3].parse()?;
    let doc_root = &args[4];

    let server = Server::new(threads, address, port, StaticFiles::new(doc_root))?;
    server.run()?;
    Ok(())
}
