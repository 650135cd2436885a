use clap::{Parser, Subcommand};
use spineforge::{
    ChapterRecord, DEFAULT_CONFIG_PATH, EditSession, EngineConfig, LayoutChoice, Result,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 📚 SpineForge - EPUB增量编辑工具
#[derive(Parser)]
#[command(name = "spineforge")]
#[command(about = "对已发布的EPUB进行插入、删除、重排与合并章节")]
#[command(version)]
struct Cli {
    /// 详细输出模式
    #[arg(short, long, global = true, help = "输出调试日志")]
    verbose: bool,

    /// 包内部目录布局
    #[arg(long, global = true, value_enum, help = "目录布局，默认取配置文件中的设置")]
    layout: Option<LayoutArg>,

    /// 配置文件路径
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 输出文件路径
    #[arg(short, long, global = true, help = "编辑结果的输出路径，默认覆盖输入文件")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// 目录布局参数
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    /// 根据包内容自动判断
    Auto,
    /// OEBPS/Text
    Legacy,
    /// EPUB/text
    Modern,
}

impl From<LayoutArg> for LayoutChoice {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Auto => LayoutChoice::Auto,
            LayoutArg::Legacy => LayoutChoice::Legacy,
            LayoutArg::Modern => LayoutChoice::Modern,
        }
    }
}

/// 章节定位参数：按路径、阅读顺序位置或来源URL
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct ChapterTarget {
    /// 章节文件在包内的路径
    #[arg(long)]
    chapter: Option<String>,

    /// 章节在阅读顺序中的位置（从0开始）
    #[arg(long)]
    index: Option<usize>,

    /// 章节的来源URL
    #[arg(long)]
    source_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 按阅读顺序列出章节
    List {
        /// EPUB文件路径
        epub: PathBuf,
    },

    /// 在指定的阅读位置插入章节
    Insert {
        epub: PathBuf,

        /// 插入位置（spine下标，超出长度时追加到末尾）
        #[arg(long)]
        index: usize,

        /// 章节标题
        #[arg(long)]
        title: String,

        /// 章节内容文件（XHTML文档或body片段）
        #[arg(long)]
        content: PathBuf,

        /// 章节来源URL
        #[arg(long)]
        source_url: Option<String>,
    },

    /// 删除章节
    Delete {
        epub: PathBuf,

        #[command(flatten)]
        target: ChapterTarget,
    },

    /// 按给定顺序重排章节
    Reorder {
        epub: PathBuf,

        /// 新顺序中的章节路径（可以只是全部章节的一个子集）
        #[arg(required = true)]
        chapters: Vec<String>,
    },

    /// 把另一个EPUB的全部章节追加到末尾
    Merge {
        /// 基础EPUB
        epub: PathBuf,

        /// 要追加的EPUB
        addition: PathBuf,
    },

    /// 原位替换章节内容与标题
    Refresh {
        epub: PathBuf,

        #[command(flatten)]
        target: ChapterTarget,

        /// 新标题
        #[arg(long)]
        title: String,

        /// 新内容文件
        #[arg(long)]
        content: PathBuf,

        /// 新的来源URL
        #[arg(long = "new-source-url")]
        new_source_url: Option<String>,
    },

    /// 检查必需条目是否存在
    Validate {
        epub: PathBuf,
    },

    /// 生成默认配置文件
    InitConfig,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "spineforge=debug"
    } else {
        "spineforge=info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli) {
        eprintln!("❌ 错误: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig = cli.command {
        EngineConfig::generate_default_config(&cli.config)?;
        println!("✅ 已生成配置文件: {}", cli.config.display());
        return Ok(());
    }

    let mut config = EngineConfig::load_or_default(&cli.config)?;
    if let Some(layout) = cli.layout {
        config.layout = layout.into();
    }
    let output = cli.output;

    match cli.command {
        Commands::List { epub } => list_chapters(&epub, &config),
        Commands::Insert {
            epub,
            index,
            title,
            content,
            source_url,
        } => {
            let mut record = ChapterRecord::new(title, fs::read_to_string(&content)?);
            record.source_url = source_url;
            let mut session = open(&epub, &config)?;
            let path = session.insert(index, &record)?;
            save(&epub, output.as_deref(), session.commit()?)?;
            println!("✅ 已插入章节: {}", path);
            Ok(())
        }
        Commands::Delete { epub, target } => {
            let mut session = open(&epub, &config)?;
            let path = resolve_target(&session, &target)?;
            session.delete(&path)?;
            save(&epub, output.as_deref(), session.commit()?)?;
            println!("✅ 已删除章节: {}", path);
            Ok(())
        }
        Commands::Reorder { epub, chapters } => {
            let mut session = open(&epub, &config)?;
            session.reorder(&chapters)?;
            save(&epub, output.as_deref(), session.commit()?)?;
            println!("✅ 已重排 {} 个章节", chapters.len());
            Ok(())
        }
        Commands::Merge { epub, addition } => {
            let mut session = open(&epub, &config)?;
            let mut source = open(&addition, &config)?;
            let added = session.merge(&mut source)?;
            save(&epub, output.as_deref(), session.commit()?)?;
            println!("✅ 已合并 {} 个章节", added);
            Ok(())
        }
        Commands::Refresh {
            epub,
            target,
            title,
            content,
            new_source_url,
        } => {
            let mut record = ChapterRecord::new(title, fs::read_to_string(&content)?);
            record.source_url = new_source_url;
            let mut session = open(&epub, &config)?;
            let path = resolve_target(&session, &target)?;
            session.refresh(&path, &record)?;
            save(&epub, output.as_deref(), session.commit()?)?;
            println!("✅ 已更新章节: {}", path);
            Ok(())
        }
        Commands::Validate { epub } => {
            let session = open(&epub, &config)?;
            println!("✅ {} 校验通过 (布局: {})", epub.display(), session.layout());
            Ok(())
        }
        Commands::InitConfig => Ok(()),
    }
}

fn open(path: &Path, config: &EngineConfig) -> Result<EditSession> {
    tracing::debug!("读取 {}", path.display());
    EditSession::open(fs::read(path)?, config)
}

/// 只有在编辑成功后才写出结果
fn save(input: &Path, output: Option<&Path>, bytes: Vec<u8>) -> Result<()> {
    let target = output.unwrap_or(input);
    fs::write(target, bytes)?;
    println!("💾 已写入: {}", target.display());
    Ok(())
}

fn resolve_target(session: &EditSession, target: &ChapterTarget) -> Result<String> {
    if let Some(path) = &target.chapter {
        return Ok(path.clone());
    }
    if let Some(index) = target.index {
        return session.chapter_at(index);
    }
    let url = target.source_url.as_deref().unwrap_or_default();
    session
        .find_by_source_url(url)?
        .map(|chapter| chapter.path)
        .ok_or_else(|| spineforge::EpubError::UnresolvedReference(format!("没有来源为 {} 的章节", url)))
}

fn list_chapters(path: &Path, config: &EngineConfig) -> Result<()> {
    let mut session = open(path, config)?;
    println!("\n📖 {} (布局: {})", path.display(), session.layout());
    let chapters = session.extract()?;
    if chapters.is_empty() {
        println!("  没有找到章节");
        return Ok(());
    }
    for (i, chapter) in chapters.iter().enumerate() {
        let sequence = chapter
            .record
            .sequence
            .map(|seq| seq.padded())
            .unwrap_or_else(|| "----".to_string());
        println!("  {}. [{}] {} ({})", i, sequence, chapter.record.title, chapter.path);
        if let Some(url) = &chapter.record.source_url {
            println!("     🔗 {}", url);
        }
    }
    println!("\n共 {} 个章节", chapters.len());
    Ok(())
}
