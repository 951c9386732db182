use clap::Parser;
use miette::Result;
use zaphod::cli::{commands, output, Cli, Commands};

fn main() -> Result<()> {
    // Install miette's fancy error handler for beautiful diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    output::init_logging(&cli.global);

    match cli.command {
        Commands::Sync(args) => commands::sync::run(args, &cli.global),
        Commands::Modules(args) => commands::modules::run(args, &cli.global),
        Commands::Rubrics(args) => commands::rubrics::run(args, &cli.global),
        Commands::Prune(args) => commands::prune::run(args, &cli.global),
        Commands::Validate(args) => commands::validate::run(args, &cli.global),
        Commands::Watch(args) => commands::watch::run(args, &cli.global),
    }
}
