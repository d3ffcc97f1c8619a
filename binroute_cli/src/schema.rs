use binroute_optimizer::json::schema::{generate_request_schema, generate_response_schema};
use clap::Args;

#[derive(Args)]
pub struct SchemaArgs {
    /// Prints the response schema instead of the request schema
    #[arg(long)]
    response: bool,
}

pub fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let schema = if args.response {
        generate_response_schema()?
    } else {
        generate_request_schema()?
    };

    println!("{schema}");
    Ok(())
}
