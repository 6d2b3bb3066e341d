use std::time::Duration;

use anyhow::Context;
use gpio_test_jig::{
    command::{handle_command, CommandError, Session},
    communication::{rpc::Link, CommunicationError},
    config::{Configuration, Role},
    dut::{read_device_id, SequenceError, Sequencer},
    indicator::Indicator,
    pins::{BoardLayout, PinBank},
};
use simplelog as sl;

fn main() -> anyhow::Result<()> {
    let config = Configuration::from_file("config.toml")?;
    init_logging(&config.log_path)?;

    let revision = config.revision();
    log::info!("Running as {:?} on a {revision:?} board", config.role);
    let layout = revision.layout();

    let serial = serialport::new(&config.uart, config.baudrate)
        .timeout(config.call_timeout())
        .open()
        .with_context(|| format!("Could not open {}", config.uart))?;

    match config.role {
        Role::Fixture => run_fixture(&config, layout, serial),
        Role::Dut => run_dut(&config, layout, serial),
    }
}

fn init_logging(path: &str) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {path}"))?;

    sl::CombinedLogger::init(vec![
        sl::TermLogger::new(
            sl::LevelFilter::Info,
            sl::Config::default(),
            sl::TerminalMode::Mixed,
            sl::ColorChoice::Auto,
        ),
        sl::WriteLogger::new(sl::LevelFilter::Info, sl::Config::default(), file),
    ])?;
    Ok(())
}

fn run_fixture(
    config: &Configuration,
    layout: BoardLayout,
    mut serial: Box<dyn serialport::SerialPort>,
) -> anyhow::Result<()> {
    let (bank, indicator) = hardware(config, &layout)?;
    let mut session = Session::new(layout, bank, indicator, config.timing)?;

    loop {
        match handle_command(&mut serial, &mut session) {
            Ok(()) => (),
            Err(CommandError::Link(CommunicationError::Io(e))) => {
                log::error!("Serial link failed: {e}");
                std::thread::sleep(Duration::from_secs(1));
            }
            Err(e) => log::error!("{e}"),
        }
    }
}

fn run_dut(
    config: &Configuration,
    layout: BoardLayout,
    serial: Box<dyn serialport::SerialPort>,
) -> anyhow::Result<()> {
    let device_id = read_device_id(&config.device_id)?;
    let (bank, indicator) = hardware(config, &layout)?;
    let link = Link::new(serial, config.call_timeout());

    let mut sequencer = Sequencer::new(link, bank, layout, indicator, device_id)
        .with_settle_time(config.settle_time())
        .with_stop_timeout(config.stop_timeout());

    match sequencer.run() {
        Ok(()) => {
            log::info!("Test sequence complete, see fixture for the result");
            Ok(())
        }
        Err(SequenceError::NoFixture(e)) => {
            log::info!("No fixture attached ({e}), ready to start coding");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(feature = "mock"))]
fn hardware(
    config: &Configuration,
    layout: &BoardLayout,
) -> anyhow::Result<(impl PinBank, impl Indicator)> {
    let bank = gpio_test_jig::pins::GpioBank::new(layout.claimed_pins())?;
    let pixel = gpio_test_jig::indicator::NeoPixel::new(config.indicator.spi_bus)?;
    Ok((bank, pixel))
}

/// Runs without GPIO or SPI access, e.g. on a development machine with a USB serial adapter
#[cfg(feature = "mock")]
fn hardware(
    config: &Configuration,
    layout: &BoardLayout,
) -> anyhow::Result<(impl PinBank, impl Indicator)> {
    let bank = gpio_test_jig::pins::MemoryBank::new(layout.claimed_pins());
    let file = gpio_test_jig::indicator::FileIndicator::new(&config.indicator.file);
    Ok((bank, file))
}
