use std::process::exit;

use args::Cli;
use clap::Parser;
use interpreter::{BootOptions, Interpreter};
use runtime::{
    classpath::{CompositeClassPath, DirectoryClassPath},
    error::{Throwable, VMError},
    native::NativeRegistry,
    object::{
        loader::{ClassLoader, LoaderOptions},
        slots::Slot,
    },
    vm::VM,
};
use tracing::{info, Level};
use tracing_subscriber::{filter::Targets, fmt, prelude::*};

mod args;

const MAIN_DESCRIPTOR: &str = "([Ljava/lang/String;)V";
const LOADER_TARGET: &str = "runtime::object::loader";
const INTERPRETER_TARGET: &str = "interpreter";

fn class_path(args: &Cli) -> CompositeClassPath {
    let mut path = CompositeClassPath::new();

    if let Some(jre) = &args.xjre {
        path.push(DirectoryClassPath::new(jre));
    }

    for entry in &args.classpath {
        path.push(DirectoryClassPath::new(entry));
    }

    path.push(DirectoryClassPath::new("."));
    path
}

fn run(args: &Cli) -> Result<(), Throwable> {
    let loader = ClassLoader::new(
        class_path(args),
        LoaderOptions {
            verbose: args.log_classes,
        },
    )?;

    let vm = VM::new(loader, NativeRegistry::with_builtins());
    let mut interpreter = Interpreter::new(
        vm,
        BootOptions {
            max_stack: args.max_stack,
            log_instructions: args.log_instructions,
        },
    );

    info!("Bootstrap complete");

    let name = args.class.replace('.', "/");
    let class = interpreter.vm_mut().class_loader().load_class(&name)?;

    let main = class
        .read()
        .method("main", MAIN_DESCRIPTOR)
        .filter(|method| method.is_static())
        .ok_or_else(|| VMError::NoSuchMethod {
            class: name.clone(),
            name: "main".to_string(),
            descriptor: MAIN_DESCRIPTOR.to_string(),
        })?;

    let loader = interpreter.vm_mut().class_loader();
    let strings = args
        .args
        .iter()
        .map(|arg| loader.intern_string(arg).map(Some))
        .collect::<Result<Vec<_>, _>>()?;
    let main_args = loader.new_reference_array("java/lang/String", strings)?;

    info!("Entering main");
    interpreter.invoke(&class, main, vec![Slot::Ref(Some(main_args))])?;

    Ok(())
}

/// Warnings always, plus the class loader or the interpreter when asked for.
fn log_targets(args: &Cli) -> Targets {
    let mut targets = Targets::new().with_default(Level::WARN);

    if args.log_classes {
        targets = targets.with_target(LOADER_TARGET, Level::INFO);
    }

    if args.log_instructions {
        targets = targets.with_target(INTERPRETER_TARGET, Level::INFO);
    }

    targets
}

fn main() {
    let args = Cli::parse();

    let format = fmt::format()
        .with_ansi(true)
        .without_time()
        .with_level(true)
        .with_target(false)
        .with_thread_names(false)
        .with_source_location(false)
        .compact();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .event_format(format)
                .with_writer(std::io::stderr),
        )
        .with(log_targets(&args))
        .init();

    info!("System starting up");

    if let Err(e) = run(&args) {
        if e.is_internal() {
            println!("/----------------------------------------------------------\\");
            println!("|The VM encountered an unrecoverable error and had to abort.|");
            println!("\\----------------------------------------------------------/");
        }

        println!("Uncaught exception in main: {}", e);
        println!("  at {}.main", args.class);
        exit(1);
    }

    info!("Execution concluded without error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_logging_only_enables_the_loader() {
        let args = Cli::parse_from(["kate", "--log-classes", "Main"]);
        let targets = log_targets(&args);

        assert!(targets.would_enable("runtime::object::loader", &Level::INFO));
        assert!(!targets.would_enable("runtime::object::loader", &Level::DEBUG));
        assert!(!targets.would_enable("interpreter", &Level::INFO));
        assert!(!targets.would_enable("cli", &Level::INFO));
        assert!(targets.would_enable("interpreter", &Level::WARN));
    }

    #[test]
    fn instruction_logging_enables_the_interpreter() {
        let args = Cli::parse_from(["kate", "--log-instructions", "Main"]);
        let targets = log_targets(&args);

        assert!(targets.would_enable("interpreter::bytecode", &Level::INFO));
        assert!(!targets.would_enable("runtime::object::loader", &Level::INFO));
    }
}
