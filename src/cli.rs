//! # Command Line Interface / 命令行接口
//!
//! Builds the clap command tree with localized help text and dispatches to
//! the subcommands.
//!
//! 使用本地化帮助文本构建 clap 命令树并分派到子命令。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::infra::t;
use crate::resolve_locale;
use commands::run::RunArgs;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` or `--lang=<VALUE>`.
///
/// 预解析命令行参数以查找语言设置，使 i18n 能在构建完整 CLI 之前初始化。
fn pre_parse_language<I: IntoIterator<Item = String>>(args: I) -> Option<String> {
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--" {
            break;
        }
        if arg == "--lang" {
            return args.next();
        }
        if let Some(value) = arg.strip_prefix("--lang=") {
            return Some(value.to_string());
        }
    }
    None
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config", locale = locale).to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn ci_python_arg(locale: &str) -> Arg {
    Arg::new("ci-python")
        .long("ci-python")
        .help(t!("cli.arg_ci_python", locale = locale).to_string())
        .value_name("VERSION")
        .action(ArgAction::Set)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("env-matrix")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(
                    Arg::new("project-dir")
                        .long("project-dir")
                        .help(t!("cli.arg_project_dir", locale = locale).to_string())
                        .value_name("PROJECT_DIR")
                        .default_value(".")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("env")
                        .short('e')
                        .long("env")
                        .help(t!("cli.arg_env", locale = locale).to_string())
                        .value_name("ENVS")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help(t!("cli.arg_jobs", locale = locale).to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("cli.arg_total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("cli.arg_runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(ci_python_arg(locale))
                .arg(
                    Arg::new("recreate")
                        .long("recreate")
                        .help(t!("cli.arg_recreate", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("fail-fast")
                        .long("fail-fast")
                        .help(t!("cli.arg_fail_fast", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("cli.arg_json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("posargs")
                        .help(t!("cli.arg_posargs", locale = locale).to_string())
                        .value_name("POSARGS")
                        .num_args(0..)
                        .last(true)
                        .allow_hyphen_values(true)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Command::new("list")
                .about(t!("cli.cmd_list_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(ci_python_arg(locale))
                .arg(
                    Arg::new("verbose")
                        .short('v')
                        .long("verbose")
                        .help(t!("cli.arg_verbose", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn path_or_default(matches: &ArgMatches, id: &str, default: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Parses the process arguments and runs the selected subcommand.
/// 解析进程参数并运行所选子命令。
pub async fn run() -> Result<()> {
    // An explicit --lang wins over both the config file and the system locale.
    let lang_override = pre_parse_language(env::args().skip(1)).map(|l| resolve_locale(&l));
    let language = match &lang_override {
        Some(lang) => {
            rust_i18n::set_locale(lang);
            lang.clone()
        }
        None => crate::init(),
    };

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let args = RunArgs {
                config: path_or_default(run_matches, "config", DEFAULT_CONFIG_FILE),
                project_dir: path_or_default(run_matches, "project-dir", "."),
                envs: strings(run_matches, "env"),
                jobs: run_matches.get_one::<usize>("jobs").copied(),
                total_runners: run_matches.get_one::<usize>("total-runners").copied(),
                runner_index: run_matches.get_one::<usize>("runner-index").copied(),
                ci_python: run_matches.get_one::<String>("ci-python").cloned(),
                recreate: run_matches.get_flag("recreate"),
                fail_fast: run_matches.get_flag("fail-fast"),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                json: run_matches.get_one::<PathBuf>("json").cloned(),
                posargs: strings(run_matches, "posargs"),
                lang: lang_override,
            };
            commands::run::execute(args).await
        }
        Some(("list", list_matches)) => {
            let config = path_or_default(list_matches, "config", DEFAULT_CONFIG_FILE);
            let ci_python = list_matches.get_one::<String>("ci-python").cloned();
            let verbose = list_matches.get_flag("verbose");
            commands::list::execute(&config, ci_python, verbose, lang_override)
        }
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            commands::init::run_init_wizard(&language, non_interactive)
        }
        // Unreachable with `subcommand_required`; clap prints help itself.
        _ => Ok(()),
    }
}
