use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

/// Command line arguments for the chatroom client
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "chatroom: a terminal client for the chatroom server.",
    long_about = "chatroom is a terminal chat client with contacts, friend requests and image sharing.\n\n\
    Optional parameters:\n\
    --server <URL>         Base URL of the chat server\n\
    --config-dir <PATH>    Override the directory for the identity cache and the log file\n\
    Use -h or --help to see all options."
)]
pub struct Args {
    /// Base URL of the chat server (REST and realtime)
    #[arg(long, value_name = "URL", env = "CHATROOM_SERVER", default_value = "https://localhost:8080")]
    pub server: String,

    /// Directory for the identity cache and chatroom.log
    #[arg(long, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,

    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LevelFilter,

    /// Prefill the username on the login form
    #[arg(long, env = "CHATROOM_USERNAME")]
    pub username: Option<String>,
}
