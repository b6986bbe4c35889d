use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use oilsight_api::{
    parse_reference_list_str, parse_samples_str, ApiClient, ApiConfig, ReferenceLoader,
};
use oilsight_core::{
    aggregate_history, discover_series, filter_by_field, filter_by_parent, to_options,
    CascadeLevel, DashboardConfig, DateRange, Sample, Selection,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "oilsight",
    about = "Lọc danh sách tham chiếu và tổng hợp lịch sử mẫu dầu."
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// In các lựa chọn con thuộc một id cha.
    Filter {
        /// File JSON danh sách tham chiếu.
        #[arg(short, long)]
        input: PathBuf,
        /// Trường cha, ví dụ `parent_site`.
        #[arg(short, long)]
        field: String,
        /// Id cha; bỏ trống để in toàn bộ.
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Gom mẫu theo ngày và in dữ liệu biểu đồ dạng JSON.
    Aggregate {
        /// File JSON danh sách mẫu.
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value_t = DashboardConfig::default().history_days)]
        days: u32,
        /// Ngày cuối (YYYY-MM-DD), mặc định hôm nay.
        #[arg(short, long)]
        end: Option<NaiveDate>,
        /// Độ lệch múi giờ tính bằng phút.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i32,
        /// Chỉ lấy mẫu của điểm lấy mẫu này.
        #[arg(long)]
        point: Option<String>,
    },
    /// Tải mọi danh sách tham chiếu từ REST API.
    Fetch {
        #[arg(long, env = "OILSIGHT_API_URL", default_value_t = ApiConfig::default().base_url)]
        base_url: String,
        #[arg(long, env = "OILSIGHT_API_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Timeout (giây) cho mỗi request.
        #[arg(long, default_value_t = ApiConfig::default().timeout_secs)]
        timeout: u64,
        /// Tải thêm lịch sử mẫu của điểm lấy mẫu này.
        #[arg(long)]
        point: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match Args::parse().command {
        Command::Filter {
            input,
            field,
            parent,
        } => run_filter(&input, &field, Selection::from(parent)),
        Command::Aggregate {
            input,
            days,
            end,
            offset,
            point,
        } => run_aggregate(&input, days, end, offset, Selection::from(point)),
        Command::Fetch {
            base_url,
            token,
            timeout,
            point,
        } => {
            let config = ApiConfig {
                base_url,
                token,
                timeout_secs: timeout,
            };
            run_fetch(config, point.map(Selection::from)).await
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Không đọc được file {path:?}"))
}

fn run_filter(input: &Path, field: &str, parent: Selection) -> anyhow::Result<()> {
    let records = parse_reference_list_str(&read_input(input)?)?;
    let matching = filter_by_field(&records, field, &parent);
    info!(total = records.len(), matching = matching.len(), "filtered");

    for option in to_options(&matching) {
        println!("{}\t{}", option.value, option.label);
    }
    Ok(())
}

fn run_aggregate(
    input: &Path,
    days: u32,
    end: Option<NaiveDate>,
    offset: i32,
    point: Selection,
) -> anyhow::Result<()> {
    let samples = parse_samples_str(&read_input(input)?)?;
    let scoped: Vec<Sample> = filter_by_parent(
        &samples,
        |sample| sample.sampling_point.as_ref().map(|p| p.id.as_str()),
        &point,
    )
    .into_iter()
    .cloned()
    .collect();

    let config = DashboardConfig {
        history_days: days,
        utc_offset_minutes: offset,
        ..DashboardConfig::default()
    };
    let end = end.unwrap_or_else(|| Utc::now().with_timezone(&config.offset()).date_naive());
    let range = DateRange::last_n_days(end, config.history_days)?;

    let series = discover_series(&scoped);
    info!(samples = scoped.len(), series = series.len(), "aggregating");
    let points = aggregate_history(&scoped, &series, &range, config.offset());

    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

async fn run_fetch(config: ApiConfig, point: Option<Selection>) -> anyhow::Result<()> {
    let loader = ReferenceLoader::new(ApiClient::new(config)?);
    let load = loader.load_all().await;

    for notice in &load.notices {
        warn!("{}", notice.message);
    }
    for level in CascadeLevel::ALL {
        let count = load.reference.list(level).ready().map_or(0, Vec::len);
        println!("{:<16}{count}", level.plural_label());
    }
    println!(
        "{:<16}{}",
        "users",
        load.reference.users.ready().map_or(0, Vec::len)
    );

    if let Some(point) = point {
        let (samples, notice) = loader.load_samples(&point).await;
        if let Some(notice) = notice {
            warn!("{}", notice.message);
        }
        println!("{:<16}{}", "samples", samples.len());
    }
    Ok(())
}
