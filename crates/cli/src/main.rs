use clap::{Parser, Subcommand};
use console::style;

#[derive(Parser)]
#[command(name = "footman")]
#[command(about = "Footman CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and default files (config, script templates).
    Init {
        /// Config file path (default: FOOTMAN_CONFIG_PATH or ~/.footman/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// List the registered scripts with their descriptions.
    List,

    /// Run a script: collect its parameters in the terminal, then execute it.
    Run {
        /// Registry path of the script, e.g. `demo/greet`. Omit it to pick from a menu.
        script: Option<String>,

        /// Config file path (default: FOOTMAN_CONFIG_PATH or ~/.footman/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Preset a parameter (repeatable). The value parses as JSON, else as text.
        #[arg(long, value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Never prompt: use presets and defaults, fail on missing required values.
        #[arg(long)]
        non_interactive: bool,
    },

    /// Generate a new script skeleton from plain-language instructions via the configured AI service.
    Generate {
        /// What the script should do. Omit it to be asked.
        instructions: Option<String>,

        /// Config file path (default: FOOTMAN_CONFIG_PATH or ~/.footman/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Write the generated source here instead of stdout.
        #[arg(long, short, value_name = "PATH")]
        output: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("FOOTMAN_LOG", "warn"))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("footman {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::List) => {
            run_list();
        }
        Some(Commands::Run {
            script,
            config,
            set,
            non_interactive,
        }) => {
            if let Err(e) = run_script(script, config, set, non_interactive) {
                log::error!("run failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Generate {
            instructions,
            config,
            output,
        }) => {
            if let Err(e) = run_generate(instructions, config, output).await {
                log::error!("generate failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let _dir = lib::init::init_config_dir(&path)?;
    println!(
        "initialized configuration at {}",
        path.parent()
            .unwrap_or(std::path::Path::new("."))
            .display()
    );
    Ok(())
}

fn run_list() {
    let registry = lib::scripts::builtin_registry();
    if registry.is_empty() {
        println!("no scripts registered");
        return;
    }
    println!("{}", style("Available Scripts").bold());
    for script in registry.scripts() {
        println!("  {:<20} {}", style(script.path()).cyan(), script.description());
    }
}

fn run_script(
    script: Option<String>,
    config_path: Option<std::path::PathBuf>,
    set: Vec<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let (config, _) = lib::config::load_config(config_path)?;
    let env = lib::config::collection_env(&config);
    let registry = lib::scripts::builtin_registry();

    let path = match script {
        Some(p) => p,
        None => match registry.navigator().select()? {
            Some(p) => p,
            None => return Ok(()),
        },
    };
    let script = registry
        .get(&path)
        .ok_or_else(|| anyhow::anyhow!("unknown script '{}'", path))?;

    let presets = parse_presets(&set)?;
    let engine = lib::prompt::PromptEngine::with_env(non_interactive, env);
    let params = engine.collect_with(&script.params(), &presets)?;

    println!("{} {}", style("Running").green().bold(), script.path());
    let host = CliHost { engine };
    script.run(&host, &params)?;
    Ok(())
}

fn parse_presets(pairs: &[String]) -> anyhow::Result<lib::schema::CollectedValues> {
    let mut values = lib::schema::CollectedValues::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--set expects KEY=VALUE, got '{}'", pair))?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        values.insert(key.to_string(), value);
    }
    Ok(values)
}

/// Inline host: script output goes to stdout, extra sections prompt right in
/// the terminal.
struct CliHost {
    engine: lib::prompt::PromptEngine,
}

impl lib::script::ScriptHost for CliHost {
    fn emit(&self, line: &str) {
        println!("{}", line);
    }

    fn request_section(
        &self,
        title: &str,
        schema: lib::schema::Schema,
        options: lib::schema::SectionOptions,
    ) -> Result<lib::schema::CollectedValues, lib::coerce::CollectionError> {
        println!();
        println!("{}", style(title).bold().underlined());
        let schema = lib::form::apply_options(&schema, &options);
        self.engine.collect(&schema)
    }
}

async fn run_generate(
    instructions: Option<String>,
    config_path: Option<std::path::PathBuf>,
    output: Option<std::path::PathBuf>,
) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    lib::init::require_initialized(&path)?;
    let (config, _) = lib::config::load_config(Some(path))?;
    let mut client = lib::llm::scripting::ScriptingClient::from_config(&config)?;

    let instructions = match instructions {
        Some(text) => text,
        None => dialoguer::Input::<String>::with_theme(&dialoguer::theme::ColorfulTheme::default())
            .with_prompt("What should the script do?")
            .interact_text()?,
    };

    println!("{}", style("Generating script...").dim());
    let code = client.generate_script(&instructions).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, format!("{code}\n"))?;
            println!("wrote {}", path.display());
        }
        None => println!("{}", code),
    }
    Ok(())
}
