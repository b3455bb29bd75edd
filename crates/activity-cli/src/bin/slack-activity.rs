use activity_cli::cmd::slack;

fn main() {
    activity_cli::main_with(slack::run);
}
