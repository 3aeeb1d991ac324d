use std::io::{self, BufRead, Write};
use std::{env, fs, process};

use lox::{Error, VM};

fn main() {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("usage: lox [path]");
            process::exit(64);
        }
    }
}

fn repl() {
    let mut vm = VM::default();
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return;
        }
        line.clear();
        match stdin.lock().read_line(&mut line) {
            // EOF exits cleanly; errors of a single line were already
            // reported, keep prompting.
            Ok(0) => {
                println!();
                return;
            }
            Ok(_) => {
                let _ = vm.interpret(&line);
            }
            Err(err) => {
                eprintln!("{}", err);
                return;
            }
        }
    }
}

fn run_file(path: &str) {
    let src = match fs::read_to_string(path) {
        Ok(src) => src,
        Err(err) => {
            eprintln!("error reading file: {}", err);
            process::exit(74);
        }
    };
    let mut vm = VM::default();
    match vm.interpret(&src) {
        Ok(()) => {}
        Err(Error::Compile) => process::exit(65),
        Err(Error::Runtime) => process::exit(70),
    }
}
