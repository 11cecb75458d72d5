fn main() -> anyhow::Result<()> {
    jackc::run()
}
