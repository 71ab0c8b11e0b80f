//! ps-shape - sanitize and shape business records
//!
//! The command-line host for ps-sanitize, handling:
//! - Sanitizing a JSON record and fitting it into a byte budget
//! - Listing policy presets
//! - Validating policy files
//! - Recovering encrypted field values

use clap::{Args, Parser, Subcommand};
use ps_cli::exit_codes::ExitCode;
use ps_cli::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use ps_sanitize::policy::POLICY_SCHEMA_VERSION;
use ps_sanitize::{FieldEncryptor, Node, Preset, SanitizeError, SanitizePolicy, Sanitizer};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// ps-shape - privacy-safe payload shaping for business records
#[derive(Parser)]
#[command(name = "ps-shape")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a JSON record and fit it into the byte budget
    Sanitize(SanitizeArgs),

    /// List the built-in policy presets
    Presets(PresetsArgs),

    /// Validate a policy file
    CheckPolicy(CheckPolicyArgs),

    /// Recover the plaintext of an encrypted field token
    Decrypt(DecryptArgs),
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Where the sanitize policy comes from.
#[derive(Args, Debug)]
struct PolicyArgs {
    /// Built-in preset (allow-encrypt, delete-on-deny, noise-strip)
    #[arg(long, conflicts_with = "policy")]
    preset: Option<Preset>,

    /// Policy file (JSON)
    #[arg(long, env = "PS_POLICY")]
    policy: Option<PathBuf>,
}

impl PolicyArgs {
    fn resolve(&self) -> Result<SanitizePolicy, SanitizeError> {
        match &self.policy {
            Some(path) => {
                debug!(path = %path.display(), "loading policy file");
                SanitizePolicy::load(path)
            }
            None => Ok(self.preset.unwrap_or_default().policy()),
        }
    }
}

#[derive(Args, Debug)]
struct SanitizeArgs {
    /// Input JSON file ("-" or omitted for stdin)
    input: Option<PathBuf>,

    #[command(flatten)]
    source: PolicyArgs,

    /// Override the payload byte budget
    #[arg(long)]
    max_bytes: Option<usize>,

    /// Add an allow-list path pattern (repeatable)
    #[arg(long = "allow", value_name = "PATTERN")]
    allow: Vec<String>,

    /// Add a keep path pattern (repeatable)
    #[arg(long = "keep", value_name = "PATTERN")]
    keep: Vec<String>,

    /// Add a drop path pattern (repeatable)
    #[arg(long = "drop", value_name = "PATTERN")]
    drop: Vec<String>,
}

#[derive(Args, Debug)]
struct PresetsArgs {
    /// Print the full policy of one preset
    #[arg(long, value_name = "PRESET")]
    show: Option<Preset>,
}

#[derive(Args, Debug)]
struct CheckPolicyArgs {
    /// Policy file to validate
    path: PathBuf,
}

#[derive(Args, Debug)]
struct DecryptArgs {
    /// Encrypted token, e.g. `nome:ENC[v1|...]`
    token: String,

    #[command(flatten)]
    source: PolicyArgs,
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    debug!(run_id = %run_id, "ps-shape starting");

    let exit_code = match &cli.command {
        Commands::Sanitize(args) => run_sanitize(&cli.global, args, &run_id),
        Commands::Presets(args) => run_presets(&cli.global, args),
        Commands::CheckPolicy(args) => run_check_policy(&cli.global, args, &run_id),
        Commands::Decrypt(args) => run_decrypt(&cli.global, args, &run_id),
    };

    debug!(run_id = %run_id, exit = %exit_code, "ps-shape finished");
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_sanitize(global: &GlobalOpts, args: &SanitizeArgs, run_id: &str) -> ExitCode {
    let mut policy = match args.source.resolve() {
        Ok(policy) => policy,
        Err(e) => return output_error(global, run_id, ExitCode::PolicyError, &e),
    };
    if let Some(max_bytes) = args.max_bytes {
        policy.limits.max_payload_bytes = max_bytes;
    }
    policy.allow_paths.extend(args.allow.iter().cloned());
    policy.keep_paths.extend(args.keep.iter().cloned());
    policy.drop_paths.extend(args.drop.iter().cloned());

    let sanitizer = match Sanitizer::new(policy) {
        Ok(sanitizer) => sanitizer,
        Err(e) => return output_error(global, run_id, ExitCode::PolicyError, &e),
    };

    let text = match read_input(args.input.as_deref()) {
        Ok(text) => text,
        Err(e) => {
            return output_message(global, run_id, ExitCode::IoError, &format!("failed to read input: {}", e))
        }
    };
    let node = match Node::from_json_str(&text) {
        Ok(node) => node,
        Err(e) => {
            return output_message(
                global,
                run_id,
                ExitCode::ArgsError,
                &format!("input is not valid JSON: {}", e),
            )
        }
    };

    let shaped = sanitizer.shape(&node);
    info!(
        run_id,
        leaves = shaped.stats.total_leaves,
        redacted = shaped.stats.redacted_total(),
        final_bytes = shaped.budget.final_bytes,
        exceeded = shaped.budget.exceeded,
        "payload shaped"
    );

    let response = serde_json::json!({
        "schema_version": POLICY_SCHEMA_VERSION,
        "run_id": run_id,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "policy_fingerprint": sanitizer.fingerprint(),
        "value": shaped.value,
        "stats": shaped.stats,
        "budget": shaped.budget,
    });

    let code = if shaped.budget.exceeded {
        ExitCode::BudgetExceeded
    } else {
        ExitCode::Clean
    };
    print_json(global, &response).map_or_else(|e| e, |()| code)
}

fn run_presets(global: &GlobalOpts, args: &PresetsArgs) -> ExitCode {
    let response = match args.show {
        Some(preset) => serde_json::json!({
            "name": preset.as_str(),
            "description": preset.description(),
            "policy": preset.policy(),
        }),
        None => {
            let presets: Vec<_> = Preset::ALL
                .iter()
                .map(|preset| {
                    let policy = preset.policy();
                    serde_json::json!({
                        "name": preset.as_str(),
                        "description": preset.description(),
                        "default": *preset == Preset::default(),
                        "deny_action": policy.deny_action,
                        "allow_list_precedence": policy.allow_list_precedence,
                        "fingerprint": policy.fingerprint(),
                    })
                })
                .collect();
            serde_json::json!({ "presets": presets })
        }
    };
    print_json(global, &response).map_or_else(|e| e, |()| ExitCode::Clean)
}

fn run_check_policy(global: &GlobalOpts, args: &CheckPolicyArgs, run_id: &str) -> ExitCode {
    let policy = match SanitizePolicy::load(&args.path).and_then(|p| p.validate().map(|()| p)) {
        Ok(policy) => policy,
        Err(e) => return output_error(global, run_id, ExitCode::PolicyError, &e),
    };

    info!(run_id, path = %args.path.display(), "policy valid");
    let response = serde_json::json!({
        "status": "valid",
        "run_id": run_id,
        "path": args.path.display().to_string(),
        "schema_version": policy.schema_version,
        "fingerprint": policy.fingerprint(),
        "deny_action": policy.deny_action,
        "allow_list_precedence": policy.allow_list_precedence,
        "encryption": policy.crypto.enabled,
        "allow_paths": policy.allow_paths.len(),
        "keep_paths": policy.keep_paths.len(),
        "drop_paths": policy.drop_paths.len(),
    });
    print_json(global, &response).map_or_else(|e| e, |()| ExitCode::Clean)
}

fn run_decrypt(global: &GlobalOpts, args: &DecryptArgs, run_id: &str) -> ExitCode {
    let mut policy = match args.source.resolve() {
        Ok(policy) => policy,
        Err(e) => return output_error(global, run_id, ExitCode::PolicyError, &e),
    };
    policy.crypto.enabled = true;

    let encryptor = match FieldEncryptor::from_env(&policy.crypto) {
        Ok(encryptor) => encryptor,
        Err(e) => return output_error(global, run_id, ExitCode::PolicyError, &e),
    };
    let plaintext = match encryptor.decrypt(args.token.trim()) {
        Ok(plaintext) => plaintext,
        Err(e) => return output_error(global, run_id, ExitCode::ArgsError, &e),
    };

    info!(run_id, "token decrypted");
    let response = serde_json::json!({ "run_id": run_id, "plaintext": plaintext });
    print_json(global, &response).map_or_else(|e| e, |()| ExitCode::Clean)
}

// ============================================================================
// Helpers
// ============================================================================

fn read_input(path: Option<&Path>) -> std::io::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path),
        _ => std::io::read_to_string(std::io::stdin()),
    }
}

fn print_json(global: &GlobalOpts, value: &serde_json::Value) -> Result<(), ExitCode> {
    let rendered = if global.pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(text) => {
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "failed to render output");
            Err(ExitCode::InternalError)
        }
    }
}

/// Report a library error on stderr in JSON.
fn output_error(global: &GlobalOpts, run_id: &str, exit_code: ExitCode, err: &SanitizeError) -> ExitCode {
    error!(run_id, code = err.code(), error = %err, "command failed");
    emit_error(global, run_id, exit_code, Some(err.code()), &err.to_string())
}

/// Report a CLI-level error on stderr in JSON.
fn output_message(global: &GlobalOpts, run_id: &str, exit_code: ExitCode, message: &str) -> ExitCode {
    error!(run_id, error = message, "command failed");
    emit_error(global, run_id, exit_code, None, message)
}

fn emit_error(
    global: &GlobalOpts,
    run_id: &str,
    exit_code: ExitCode,
    error_code: Option<u32>,
    message: &str,
) -> ExitCode {
    let response = serde_json::json!({
        "status": "error",
        "run_id": run_id,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "error": {
            "exit": exit_code.code_name(),
            "code": error_code,
            "message": message,
        }
    });
    let rendered = if global.pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    match rendered {
        Ok(text) => eprintln!("{}", text),
        Err(_) => eprintln!("error: {}", message),
    }
    exit_code
}
