use clap::{arg,crate_version,Arg,ArgAction,Command};
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::path::{Path,PathBuf};
use unicompress::{html,Options,PackedText,STD_OPTIONS,LEGACY_OPTIONS};
type DYNERR = Box<dyn std::error::Error>;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

#[derive(Clone,Copy,PartialEq)]
enum Mode {
    Compress,
    Decompress
}

fn build_cli() -> Command {
    let long_help =
"Examples:
---------
Compress:      `unicompress compress notes.txt index.html`
Decompress:    `unicompress decompress notes.txt.uc index.html.uc`";

    let formats = ["wide","legacy"];
    let files = || arg!(<FILES> ... "paths of files to process").value_parser(clap::value_parser!(PathBuf));
    let format = || arg!(-f --format <FORMAT> "token format, legacy is readable by older tools")
        .value_parser(formats)
        .default_value("wide");

    Command::new("unicompress")
        .about("Compress text files into Unicode text")
        .after_long_help(long_help)
        .version(crate_version!())
        .disable_version_flag(true)
        .arg(Arg::new("version").short('v').long("version")
            .action(ArgAction::Version)
            .help("Print version"))
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand(Command::new("compress")
            .arg(format())
            .arg(Arg::new("no-minify").long("no-minify")
                .action(ArgAction::SetTrue)
                .help("do not minify files detected as HTML"))
            .arg(files())
            .about("compress files, each is written to <FILE>.uc"))
        .subcommand(Command::new("decompress")
            .visible_alias("expand")
            .arg(format())
            .arg(files())
            .about("decompress files, <FILE>.uc is written to <FILE>"))
}

/// append a suffix without disturbing any existing extension
fn with_suffix(path: &Path,suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

fn decompressed_path(path: &Path) -> PathBuf {
    match path.extension() {
        Some(ext) if ext == "uc" => path.with_extension(""),
        _ => with_suffix(path,".decompressed")
    }
}

/// Process one file, the output is only written once the whole result is in hand.
fn process_file(path: &Path,mode: Mode,minify: bool,opt: &Options) -> Result<PathBuf,DYNERR> {
    println!("Processing {}...",path.display());
    let raw = std::fs::read(path)?;
    let (out_path,out) = match mode {
        Mode::Compress => {
            let text = match String::from_utf8(raw) {
                Ok(s) => s,
                Err(_) => return Err(Box::new(unicompress::Error::UnsupportedInput("file is not UTF-8 text".to_string())))
            };
            let packed = if minify && html::is_html(path,&text) {
                println!("Detected HTML file, applying HTML-specific compression.");
                unicompress::compress_html(&text,opt)?
            } else {
                unicompress::compress_text(&text,opt)?
            };
            let original_size = text.chars().count();
            let compressed_size = packed.len();
            println!("Original size: {} characters",original_size);
            println!("Compressed size: {} characters",compressed_size);
            println!("Compression ratio: {:.2}x",original_size as f64 / compressed_size as f64);
            (with_suffix(path,".uc"),packed.to_bytes())
        },
        Mode::Decompress => {
            let packed = PackedText::from_bytes(&raw)?;
            let text = unicompress::decompress_text(&packed,opt)?;
            (decompressed_path(path),text.into_bytes())
        }
    };
    std::fs::write(&out_path,out)?;
    println!("Output written to {}",out_path.display());
    Ok(out_path)
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = match build_cli().try_get_matches() {
        Ok(m) => m,
        Err(e) => {
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 0,
                _ => 1
            };
            e.print()?;
            std::process::exit(code);
        }
    };

    let (mode,cmd) = match matches.subcommand_matches("compress") {
        Some(cmd) => (Mode::Compress,cmd),
        None => (Mode::Decompress,matches.subcommand_matches("decompress").expect(RCH))
    };
    let opt = match cmd.get_one::<String>("format").expect(RCH).as_str() {
        "legacy" => LEGACY_OPTIONS,
        _ => STD_OPTIONS
    };
    let minify = mode==Mode::Compress && !cmd.get_flag("no-minify");

    let mut results: Vec<(PathBuf,bool)> = Vec::new();
    for path in cmd.get_many::<PathBuf>("FILES").expect(RCH) {
        if !path.exists() {
            log::error!("File not found: {}",path.display());
            results.push((path.clone(),false));
            continue;
        }
        match process_file(path,mode,minify,&opt) {
            Ok(_) => results.push((path.clone(),true)),
            Err(e) => {
                log::error!("Error processing {}: {}",path.display(),e);
                results.push((path.clone(),false));
            }
        }
    }

    println!("\nSummary:");
    for (path,success) in &results {
        println!("{}: {}",path.display(),match success { true => "Success", false => "Failed" });
    }
    let success_count = results.iter().filter(|(_,success)| *success).count();
    println!("\nProcessed {} of {} files successfully.",success_count,results.len());

    Ok(())
}
