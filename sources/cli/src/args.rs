use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The class whose `main` to run
    pub class: String,

    /// Arguments passed to `main`
    pub args: Vec<String>,

    #[arg(long("cp"))]
    /// A list of paths to add to the classpath
    pub classpath: Vec<String>,

    #[arg(long)]
    /// Directory holding the runtime library classes, searched before the classpath
    pub xjre: Option<String>,

    #[arg(long)]
    /// Print a line for every class as it is loaded
    pub log_classes: bool,

    #[arg(long)]
    /// Print every instruction before it executes
    pub log_instructions: bool,

    #[arg(long, default_value_t = 1024)]
    /// How many frames deep execution may go
    pub max_stack: usize,
}
