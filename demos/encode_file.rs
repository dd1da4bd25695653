use huffman::driver::{self, Config};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("usage: encode_file --in <text> [--out <artifact>] [--decoded <text>] [--no-verify]");
            process::exit(2);
        }
    };

    match driver::run(&config) {
        Ok(report) => {
            let input_bytes = fs::metadata(&config.input).map(|m| m.len()).unwrap_or(0);
            println!(
                "{} symbols ({} distinct) -> {} bits, {} bytes on disk ({:.1}% of input)",
                report.symbols,
                report.distinct_symbols,
                report.encoded_bits,
                report.artifact_bytes,
                report.ratio(input_bytes) * 100.0
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
