// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("repomux")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Repomux Contributors")
        .about("Parse distribution package metadata into normalized records")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Repository definitions file (TOML); built-in definitions if omitted"),
        )
        .subcommand(Command::new("list").about("List defined repositories"))
        .subcommand(
            Command::new("parse")
                .about("Parse repositories and print one JSON record per line")
                .arg(
                    Arg::new("repos_dir")
                        .short('r')
                        .long("repos-dir")
                        .value_name("DIR")
                        .default_value(".")
                        .help("Directory holding one subdirectory per repository"),
                )
                .arg(
                    Arg::new("all")
                        .short('a')
                        .long("all")
                        .action(clap::ArgAction::SetTrue)
                        .help("Parse every defined repository"),
                )
                .arg(
                    Arg::new("repos")
                        .num_args(0..)
                        .help("Repository names or tags"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("repomux.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
