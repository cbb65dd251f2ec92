use clap::{Parser as ClapParser, Subcommand};
use std::{path::PathBuf, process};

use objcore::{
    Allocator, HeapCreateInfo, StringObject, VM, VMCreateInfo, dereference,
    load_image, read_directory, save_image, untag_as,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Heap size in bytes, rounded up to whole pages
    #[arg(long, default_value_t = HeapCreateInfo::default().size)]
    heap_size: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a directory, directories end in `/`
    Ls { dir: PathBuf },
    /// Look up an environment variable through the getenv primitive
    Getenv { name: String },
    /// Save an image holding a string and a handle to it, then reload it
    Image { path: PathBuf },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let info = VMCreateInfo {
        heap: HeapCreateInfo {
            size: cli.heap_size,
        },
        ..Default::default()
    };

    let result = match cli.command {
        Command::Ls { dir } => list(&dir),
        Command::Getenv { name } => getenv(info, &name),
        Command::Image { path } => image(info, &path),
    };
    if let Err(err) = result {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn list(dir: &std::path::Path) -> CliResult {
    let mut entries = read_directory(dir)?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    for entry in entries {
        let suffix = if entry.is_directory { "/" } else { "" };
        println!("{}{suffix}", entry.name.to_string_lossy());
    }
    Ok(())
}

fn getenv(info: VMCreateInfo, name: &str) -> CliResult {
    let mut vm = VM::new(info);
    let name = vm.heap.allocate_str(name)?;
    vm.push(name.as_value());
    vm.call("getenv")?;
    let value = vm.pop()?;
    match untag_as::<StringObject>(value) {
        // SAFETY: no allocation while the reference lives
        Ok(s) => println!("{}", unsafe { s.as_ref() }.to_string_lossy()),
        Err(_) => println!("f"),
    }
    Ok(())
}

fn image(info: VMCreateInfo, path: &std::path::Path) -> CliResult {
    let mut vm = VM::new(info);
    let string = vm.heap.allocate_str("survivor")?;
    let handle = vm.heap.make_handle(string.as_value())?;
    let handle_offset = vm.heap.offset_of(handle.as_value());
    let string_offset = vm.heap.offset_of(string.as_value());

    save_image(&vm, path)?;
    let loaded = load_image(path)?;

    if let Some(handle) = handle_offset.and_then(|o| loaded.heap.value_at(o)) {
        match dereference(handle) {
            Ok(_) => println!("handle: live"),
            Err(err) => println!("handle: {err}"),
        }
    }
    if let Some(string) = string_offset.and_then(|o| loaded.heap.value_at(o)) {
        let string = untag_as::<StringObject>(string)?;
        // SAFETY: no allocation while the reference lives
        println!("string: {:?}", unsafe { string.as_ref() }.to_string_lossy());
    }
    println!(
        "{} live handles in {} bytes",
        loaded.heap.live_handles(),
        loaded.heap.used()
    );
    Ok(())
}
