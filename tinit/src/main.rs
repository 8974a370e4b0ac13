//! Entry point for tinit, the first process of the VM initramfs.

#[cfg(not(target_os = "linux"))]
compile_error!("tinit is Linux-only; build with a Linux target");

use std::path::PathBuf;

use clap::Parser;
use tinit::{BootConfig, LinuxKernel, Sequencer};

/// tinit - loads kernel modules, drops the initramfs and hands over to the real init
#[derive(Parser, Debug)]
#[command(author, version, about = "Early-boot sequencer for the VM initramfs")]
struct InitArgs {
    /// Module manifest: one xz-compressed module path per line, loaded in order
    manifest: PathBuf,
}

fn main() {
    // A panic in pid 1 panics the kernel; make sure it is at least visible
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("[PANIC] tinit panicked: {}", panic_info);
        std::process::exit(1);
    }));

    // Respects RUST_LOG (passed through from the kernel command line)
    if let Err(e) = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init()
    {
        eprintln!("[ERROR] Failed to initialize tracing: {}", e);
    }

    let args = InitArgs::parse();

    let mut sequencer = Sequencer::new(BootConfig::default(), LinuxKernel);
    let err = match sequencer.run(&args.manifest) {
        Ok(never) => match never {},
        Err(e) => e,
    };

    tracing::error!("Boot aborted: {:?}", err);
    eprintln!("tinit: {} failed: {}", err.phase(), error_chain(&err));
    std::process::exit(1);
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        // Variants already embed their immediate source in the message
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}
