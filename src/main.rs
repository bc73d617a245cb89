fn main() {
    drmhwc::cli::main();
}
