//! passvault 命令行入口
//!
//! 用法：
//!   passvault [--vault <file>] init
//!   passvault [--vault <file>] list [query]
//!   passvault [--vault <file>] show <title>
//!   passvault [--vault <file>] add <title> [--url ..] [--user ..] [--notes ..] [--generate]
//!   passvault [--vault <file>] remove <title>
//!   passvault generate [--length N] [--no-symbols]
//!   passvault [--vault <file>] export <file>
//!   passvault [--vault <file>] import <file>
//!
//! 口令优先取环境变量 `PASSVAULT_PASSPHRASE`，否则在终端提示输入。
//! 所有实际逻辑都委托给库中的 `VaultSession`。

use std::path::{Path, PathBuf};
use std::process::exit;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use passvault::config::Settings;
use passvault::crypto::rng::RandomSource;
use passvault::generator::{self, PasswordPolicy};
use passvault::{Entry, VaultSession, logging};

const PASSPHRASE_ENV: &str = "PASSVAULT_PASSPHRASE";
const DEFAULT_VAULT: &str = "passwords.crypt";

#[derive(Parser)]
#[command(name = "passvault", version, about = "Encrypted password vault")]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// vault 文件路径
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 创建新的空 vault
    Init,
    /// 列出条目标题（可按标题过滤）
    List { query: Option<String> },
    /// 显示单个条目
    Show { title: String },
    /// 添加条目
    Add {
        title: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// 生成随机口令，而不是提示输入
        #[arg(long)]
        generate: bool,
    },
    /// 删除条目
    Remove { title: String },
    /// 生成随机口令
    Generate {
        #[arg(long)]
        length: Option<usize>,
        #[arg(long)]
        no_symbols: bool,
    },
    /// 导出为未加密的 gzip XML
    Export { file: PathBuf },
    /// 从未加密文件导入，替换 vault 中的条目
    Import { file: PathBuf },
}

fn main() {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref());

    let level = if cli.verbose { "debug" } else { settings.log.level.as_str() };
    logging::init(level);

    if let Err(e) = run(cli, &settings) {
        eprintln!("Error: {e:#}");
        exit(1);
    }
}

fn run(cli: Cli, settings: &Settings) -> Result<()> {
    let vault = cli
        .vault
        .or_else(|| settings.vault.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_VAULT));

    match cli.command {
        Command::Init => {
            if vault.exists() {
                bail!("{} already exists", vault.display());
            }
            let passphrase = new_passphrase()?;
            VaultSession::create(&vault, &passphrase)?;
            println!("created {}", vault.display());
        }
        Command::List { query } => {
            let session = open(&vault)?;
            let hits = match &query {
                Some(q) => session.search(q),
                None => session.entries().iter().collect(),
            };
            for entry in hits {
                println!("{}", entry.title);
            }
        }
        Command::Show { title } => {
            let session = open(&vault)?;
            let entry = session
                .get(&title)
                .with_context(|| format!("no entry titled {title:?}"))?;
            print_entry(entry);
        }
        Command::Add {
            title,
            url,
            user,
            notes,
            generate,
        } => {
            let mut session = open(&vault)?;
            let password = if generate {
                generate_password(&settings.password_policy())?
            } else {
                rpassword::prompt_password("Entry password: ").context("read entry password")?
            };

            let entry = Entry {
                title,
                url,
                user,
                password: Some(password).filter(|p| !p.is_empty()),
                notes,
            };
            session.add(entry)?;
            session.save()?;
        }
        Command::Remove { title } => {
            let mut session = open(&vault)?;
            session.remove(&title)?;
            session.save()?;
        }
        Command::Generate { length, no_symbols } => {
            let mut policy = settings.password_policy();
            if let Some(length) = length {
                policy.length = length;
            }
            if no_symbols {
                policy.symbols = None;
            }
            println!("{}", generate_password(&policy)?);
        }
        Command::Export { file } => {
            let session = open(&vault)?;
            eprintln!("warning: all data will be stored unencrypted in {}", file.display());
            session.export(&file)?;
        }
        Command::Import { file } => {
            let mut session = open_or_empty(&vault)?;
            session.import(&file)?;
            let passphrase = read_passphrase()?;
            session.save_as(&vault, &passphrase)?;
            println!("imported {} entries", session.entries().len());
        }
    }

    Ok(())
}

fn open(vault: &Path) -> Result<VaultSession> {
    let passphrase = read_passphrase()?;
    match VaultSession::open(vault, &passphrase) {
        Ok(session) => Ok(session),
        Err(e) if e.is_not_found() => {
            bail!("{e}\n\nrun `passvault init` to create the vault")
        }
        Err(e) => Err(e.into()),
    }
}

fn open_or_empty(vault: &Path) -> Result<VaultSession> {
    if vault.exists() {
        open(vault)
    } else {
        Ok(VaultSession::new())
    }
}

fn read_passphrase() -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    rpassword::prompt_password("Passphrase: ").context("read passphrase")
}

fn new_passphrase() -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }

    let first = rpassword::prompt_password("New passphrase: ").context("read passphrase")?;
    let second = rpassword::prompt_password("Repeat passphrase: ").context("read passphrase")?;
    if first != second {
        bail!("passphrases do not match");
    }
    Ok(first)
}

fn generate_password(policy: &PasswordPolicy) -> Result<String> {
    let mut rng = RandomSource::new();
    if !rng.is_secure() {
        bail!("no cryptographically secure random source available");
    }
    Ok(generator::generate(policy, &mut rng)?)
}

fn print_entry(entry: &Entry) {
    println!("title:    {}", entry.title);
    let fields = [
        ("url", &entry.url),
        ("user", &entry.user),
        ("password", &entry.password),
        ("notes", &entry.notes),
    ];
    for (name, value) in fields {
        if let Some(value) = value {
            println!("{:<9} {value}", format!("{name}:"));
        }
    }
}
