mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ストア&フォワード型バックグラウンドアップロードエージェント
#[derive(Parser)]
#[command(name = "fileforward", version, about)]
struct Cli {
    /// SQLite データベースのパス（省略時は FF_DB_PATH またはデータディレクトリ）
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// ファイルをアップロードキューに追加する
    Enqueue {
        /// 対象ファイル
        file: PathBuf,
        /// Bearer トークン（省略時は FF_UPLOAD_TOKEN 環境変数）
        #[arg(long)]
        token: Option<String>,
        /// 添付ラベル
        #[arg(long)]
        label: Option<String>,
        /// 説明
        #[arg(long)]
        description: Option<String>,
    },
    /// キューに残っているレコードを一覧する
    List,
    /// 保留中のアップロードを今すぐ処理する
    Drain,
    /// 完了結果を表示する
    Result { id: String },
    /// レコードをキューから削除する
    Remove { id: String },
    /// 保持期間を過ぎた結果・failed レコードを削除する
    Cleanup {
        /// 保持日数
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let service = commands::open_service(cli.db)?;

    match cli.command {
        Command::Enqueue {
            file,
            token,
            label,
            description,
        } => commands::enqueue(&service, &file, token, label, description),
        Command::List => commands::list(&service),
        Command::Drain => commands::drain(&service).await,
        Command::Result { id } => commands::result(&service, &id),
        Command::Remove { id } => commands::remove(&service, &id),
        Command::Cleanup { days } => commands::cleanup(&service, days),
    }
}
