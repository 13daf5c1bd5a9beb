//! Command handlers for the docqa CLI.

mod ask;
mod index;
mod load;
mod query;
mod stats;

pub use ask::AskCommand;
pub use index::IndexCommand;
pub use load::LoadCommand;
pub use query::QueryCommand;
pub use stats::StatsCommand;

use clap::ValueEnum;
use docqa_core::config::AppConfig;
use docqa_core::AppResult;
use docqa_engine::{EngineConfig, QaSession, Vote};

/// Vote flag shared by the answering commands.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum VoteArg {
    Up,
    Down,
}

impl From<VoteArg> for Vote {
    fn from(arg: VoteArg) -> Self {
        match arg {
            VoteArg::Up => Vote::Up,
            VoteArg::Down => Vote::Down,
        }
    }
}

/// Open a session backed by the workspace's on-disk vector index.
pub fn open_session(config: &AppConfig) -> AppResult<QaSession> {
    let engine_config = EngineConfig::from_app_config(config);
    QaSession::open(engine_config, Some(&config.index_path()))
}

/// Print the analytics summary for this session.
pub fn print_analytics(session: &QaSession) {
    let summary = session.analytics_summary();
    println!();
    println!("Session analytics:");
    println!("  Queries:        {}", summary.total_queries);
    println!("  Cache hit rate: {:.0}%", summary.cache_hit_rate * 100.0);
    println!(
        "  Votes:          {} up / {} down",
        summary.up_votes, summary.down_votes
    );
    println!("  Avg latency:    {:.0}ms", summary.avg_latency_ms);
}
