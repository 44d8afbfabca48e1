use {
    anyhow::Result,
    clap::Parser,
    td3fd::cli::{
        run,
        Args,
    },
};


fn main() -> Result<()> {
    run(Args::parse())
}
