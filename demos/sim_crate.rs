use std::time::Duration;

use caenhv_ctl::{
    ChannelConfigBuilder, ControllerConfig, HvController, RampOutcome,
    clock::ManualClock,
    report::CrateFilter,
    sim::SimCrate,
};
use inquire::{CustomType, Select};
use log::info;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

// Simulated crate layout
const BOARDS: [(u16, &str, u16); 2] = [(0, "A1535", 4), (3, "A1833", 2)];
const SLOTS: u16 = 6;

#[derive(Debug, Display, EnumIter, Clone, Copy)]
enum Action {
    #[strum(serialize = "Set channel voltage")]
    SetVoltage,
    #[strum(serialize = "Configure channel")]
    Configure,
    #[strum(serialize = "Power down all channels")]
    PowerDownAll,
    #[strum(serialize = "Show channel summary")]
    Summary,
    #[strum(serialize = "Show crate report")]
    CrateReport,
    #[strum(serialize = "Dispatch crate for a minute")]
    Dispatch,
    Quit,
}

fn pick_channel(
    ctl: &HvController<SimCrate, ManualClock>,
) -> Result<(u16, u16), inquire::InquireError> {
    let channels: Vec<String> = ctl
        .channels()
        .into_iter()
        .map(|(slot, ch)| format!("{slot}/{ch}"))
        .collect();
    let picked = Select::new("Slot/channel:", channels).prompt()?;
    let (slot, ch) = picked.split_once('/').unwrap_or(("0", "0"));
    Ok((slot.parse().unwrap_or(0), ch.parse().unwrap_or(0)))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let sim = SimCrate::new(SLOTS);
    for (slot, model, n_channel) in BOARDS {
        sim.add_board(slot, model, n_channel);
    }

    // Sleeps only advance simulated time.
    let clock = ManualClock::new();
    let config = ControllerConfig::default().with_verbose(true);
    let mut ctl = HvController::connect_with_clock(sim.clone(), config, clock.clone())?;
    println!("Connected, crate map: {:#?}", ctl.crate_map());

    loop {
        let action = Select::new("What next?", Action::iter().collect()).prompt()?;
        match action {
            Action::SetVoltage => {
                let (slot, ch) = pick_channel(&ctl)?;
                let target = CustomType::<f64>::new("Target voltage (V):")
                    .with_default(100.0)
                    .prompt()?;
                match ctl.set_channel_voltage(slot, ch, target)? {
                    RampOutcome::Settled { waited, .. } => {
                        println!("Settled after {} s of simulated time", waited.as_secs())
                    }
                    other => println!("Ramp not completed: {:?}", other),
                }
            }
            Action::Configure => {
                let (slot, ch) = pick_channel(&ctl)?;
                let v0 = CustomType::<f64>::new("V0Set (V):").with_default(500.0).prompt()?;
                let i0 = CustomType::<f64>::new("I0Set (uA):").with_default(20.0).prompt()?;
                let up = CustomType::<f64>::new("RUp (V/s):").with_default(20.0).prompt()?;
                let down = CustomType::<f64>::new("RDWn (V/s):").with_default(20.0).prompt()?;
                match ChannelConfigBuilder::new(v0, i0).with_ramp(up, down).build() {
                    Ok(config) => ctl.configure_channel(slot, ch, &config)?,
                    Err(e) => println!("Rejected: {e}"),
                }
            }
            Action::PowerDownAll => {
                let switched = ctl.power_down_all_channels()?;
                println!("Switched off {switched} channels");
            }
            Action::Summary => {
                let (slot, ch) = pick_channel(&ctl)?;
                println!("{}", ctl.channel_summary(slot, ch)?);
            }
            Action::CrateReport => {
                let filter = CrateFilter::with_params(["V0Set", "VMon", "Status", "Pw"]);
                for report in ctl.crate_info(&filter)? {
                    println!("{report}");
                }
            }
            Action::Dispatch => {
                let outcome = ctl.dispatch(Duration::from_secs(60));
                info!("Dispatch: {:?}", outcome);
                if let Err(e) = ctl.read_system_prop("ModelName") {
                    println!("While dispatched: {e}");
                }
                clock.advance(Duration::from_secs(60));
                ctl.reconnect()?;
                println!("Window passed, reconnected");
            }
            Action::Quit => break,
        }
    }

    ctl.disconnect();
    println!("Vendor calls made: {}", sim.journal().len());
    Ok(())
}
