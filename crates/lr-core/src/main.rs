use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use lr_backend::LettaClient;
use lr_core::config::Config;
use lr_core::relay::run_cycle;
use lr_core::response_log::ResponseLogger;
use lr_protocol::{ChatMessage, DisplayPreferences, RelayRequest};

fn print_help() {
    println!("letta-relay — relay one user turn through a Letta agent");
    println!();
    println!("Usage:");
    println!("  letta-relay \"message\"            Send a message, print host events as JSON lines");
    println!("  echo \"message\" | letta-relay     Same, message via stdin pipe");
    println!();
    println!("Options:");
    println!("  --config <path>   Use an alternate config file");
    println!("  --no-events       Suppress tool progress status events");
    println!("  --hide-reasoning  Suppress reasoning events");
    println!("  --hide-usage      Suppress the usage summary");
    println!("  --version         Print version");
    println!("  --help            Print this help");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("letta-relay {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = match config_arg(&args) {
        Ok(Some(path)) => Config::load_from(&path),
        Ok(None) => Config::load_or_default(),
        Err(msg) => {
            eprintln!("error: {msg}");
            std::process::exit(2);
        }
    };

    let user_prefs = DisplayPreferences {
        display_events: !args.iter().any(|a| a == "--no-events"),
        show_reasoning: !args.iter().any(|a| a == "--hide-reasoning"),
        show_usage_stats: !args.iter().any(|a| a == "--hide-usage"),
    };
    let prefs = config.display.to_preferences().and(user_prefs);

    // Message: positional arg (non-flag) or piped stdin.
    let non_flag_args = positional_args(&args);
    let stdin_is_pipe = !io::stdin().is_terminal();

    let message = if let Some(arg) = non_flag_args.first() {
        (*arg).clone()
    } else if stdin_is_pipe {
        let mut buf = String::new();
        match io::stdin().read_to_string(&mut buf) {
            Ok(_) if !buf.trim().is_empty() => buf.trim().to_string(),
            _ => {
                eprintln!("error: no message provided");
                std::process::exit(2);
            }
        }
    } else {
        print_help();
        std::process::exit(2);
    };

    let base_url = config.letta.resolve_base_url();
    let agent_id = match config.letta.resolve_agent_id() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let password = match config.letta.resolve_password() {
        Ok(pw) => pw,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    if config.log.dev_mode {
        eprintln!("[letta-relay] base_url={base_url} agent_id={agent_id}");
    }

    let mut logger = if config.log.save_responses {
        let path = config.log.resolve_log_path();
        match ResponseLogger::new(&path) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!(
                    "warning: cannot open response log {}: {e}",
                    path.display()
                );
                ResponseLogger::noop()
            }
        }
    } else {
        ResponseLogger::noop()
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            std::process::exit(1);
        }
    };

    let client = LettaClient::new(base_url, agent_id, password);
    let request = RelayRequest::from_messages(vec![ChatMessage::user(message)]);

    let outcome = runtime.block_on(async {
        let frames = client.send(&request);
        run_cycle(frames, prefs, &mut logger, |event| {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("error: failed to serialize event: {e}"),
            }
        })
        .await
    });

    if let Some(failure) = outcome.failure {
        eprintln!("error: {failure}");
        std::process::exit(1);
    }
}

fn config_arg(args: &[String]) -> Result<Option<PathBuf>, String> {
    match args.iter().position(|a| a == "--config") {
        Some(pos) => match args.get(pos + 1) {
            Some(value) => Ok(Some(PathBuf::from(value))),
            None => Err("--config requires a path argument".to_string()),
        },
        None => Ok(None),
    }
}

fn positional_args(args: &[String]) -> Vec<&String> {
    let mut positionals = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--config" {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            positionals.push(arg);
        }
    }
    positionals
}
