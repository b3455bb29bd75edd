use activity_cli::cmd::github;

fn main() {
    activity_cli::main_with(github::run);
}
