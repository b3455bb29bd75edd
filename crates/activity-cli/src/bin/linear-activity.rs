use activity_cli::cmd::linear;

fn main() {
    activity_cli::main_with(linear::run);
}
