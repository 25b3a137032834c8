use std::io::{self, Write};

use clap_complete::{generate, Shell};

pub fn generate_completions(shell: Shell, buf: &mut dyn Write) {
    let mut cmd = crate::cli::styled_command();
    generate(shell, &mut cmd, "guidechain", buf);
}

pub fn run_completions_command(shell: Shell) {
    let mut stdout = io::stdout().lock();
    generate_completions(shell, &mut stdout);
}
