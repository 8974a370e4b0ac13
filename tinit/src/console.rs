//! Coloured status banners on the VM console.

use crate::error::Phase;

const GREEN: &str = "\x1b[1;32m";
const YELLOW: &str = "\x1b[1;33m";
const RESET: &str = "\x1b[m";

pub fn welcome_line() -> String {
    format!("{GREEN}Welcome to goblin!{RESET}")
}

pub fn phase_line(phase: Phase) -> String {
    let text = match phase {
        Phase::LoadModules => "Loading essential kernel modules...",
        Phase::CleanInitramfs => "Cleaning up initramfs...",
        Phase::EstablishRoot => "Mounting root filesystem...",
        Phase::SwitchRoot => "Switching over...",
        Phase::ExecInit => "Starting init...",
    };
    format!("{YELLOW}{text}{RESET}")
}

pub fn welcome() {
    println!("{}", welcome_line());
}

pub fn announce(phase: Phase) {
    println!("{}", phase_line(phase));
    tracing::info!("Entering phase: {}", phase);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banners() {
        assert_eq!(welcome_line(), "\x1b[1;32mWelcome to goblin!\x1b[m");
        assert_eq!(
            phase_line(Phase::CleanInitramfs),
            "\x1b[1;33mCleaning up initramfs...\x1b[m"
        );
    }
}
