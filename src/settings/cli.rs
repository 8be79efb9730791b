use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Issues and rotates access/refresh token pairs")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
}
