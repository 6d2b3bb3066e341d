use crate::{
    communication::rpc::DeviceId,
    indicator::{Color, Indicator, IndicatorTiming},
    pins::{BoardLayout, PinBank},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    /// No DUT under test. Pins float, the pixel shows the idle color.
    Idle,
    /// Between `start` and `stop`, pins are being tested
    Active,
    /// Signalling the outcome. Nothing else is serviced meanwhile.
    Reporting,
}

/// Everything the fixture keeps across requests: the pass/fail tally, the pins and the pixel
pub struct Session<B: PinBank, I: Indicator> {
    pub(crate) state: SessionState,
    /// Mismatches found since the last `start`
    pub(crate) tally: u32,
    /// Identifier reported by the DUT currently in the rig
    pub(crate) device_id: Option<DeviceId>,
    pub(crate) layout: BoardLayout,
    pub(crate) bank: B,
    pub(crate) indicator: I,
    pub(crate) timing: IndicatorTiming,
}

impl<B: PinBank, I: Indicator> Session<B, I> {
    pub fn new(
        layout: BoardLayout,
        bank: B,
        indicator: I,
        timing: IndicatorTiming,
    ) -> anyhow::Result<Self> {
        let mut session = Session {
            state: SessionState::Idle,
            tally: 0,
            device_id: None,
            layout,
            bank,
            indicator,
            timing,
        };
        session.enter_idle()?;
        Ok(session)
    }

    pub(crate) fn enter_idle(&mut self) -> anyhow::Result<()> {
        self.bank.float_all(&self.layout.pins)?;
        self.indicator.display(Color::IDLE)?;
        self.state = SessionState::Idle;

        log::info!("*********************");
        log::info!("* Ready for testing *");
        log::info!("* Insert DUT in rig *");
        log::info!("*********************");
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn tally(&self) -> u32 {
        self.tally
    }

    #[must_use]
    pub fn device_id(&self) -> Option<DeviceId> {
        self.device_id
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}
