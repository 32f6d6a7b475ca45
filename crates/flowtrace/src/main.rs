fn main() -> anyhow::Result<()> {
    flowtrace::run()
}
