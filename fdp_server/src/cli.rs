use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 12] = [
        "RUST_LOG",
        "FDP_HOST",
        "FDP_PORT",
        "FDP_DATABASE_URL",
        "FDP_JWT_EXPIRY",
        "FDP_QUEUE_URL",
        "FDP_QUEUE_MAX_ATTEMPTS",
        "FDP_RUN_WORKERS",
        "FDP_STRIPE_API_URL",
        "FDP_STRIPE_WEBHOOK_TOLERANCE",
        "FDP_DEFAULT_DELIVERY_FEE",
        "FDP_CURRENCY",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
