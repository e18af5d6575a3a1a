use clap::Parser;

use crate::graph::clamp_k;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/recvizapi";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Base URL of the recommendation service.
    #[arg(long, env = "RECVIZ_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Initial number of recommendations shown in the comparison view.
    #[arg(long, env = "RECVIZ_DEFAULT_K", default_value_t = 10)]
    default_k: usize,

    /// Number of recommendations per user used to colour matching edges.
    #[arg(long, env = "RECVIZ_MATCH_K", default_value_t = 10)]
    match_k: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub default_k: usize,
    pub match_k: usize,
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        Self {
            api_url: args.api_url,
            default_k: clamp_k(args.default_k),
            match_k: args.match_k.max(1),
        }
    }
}
