//! Slot selection commands.

use amadon::translations::{Catalog, Slot, SlotAssignment, SlotChange, SlotValue, NONE_VALUE};
use clap::Subcommand;

use super::common::Context;
use crate::error::CliError;

#[derive(Debug, Subcommand)]
pub enum SlotsCommands {
    /// Show the translation in each slot
    Show,

    /// Assign a catalog entry to a slot
    Set {
        /// Slot number (1, 2 or 3)
        slot: String,

        /// Catalog index from `amadon catalog list`, or -1 to clear slots 2 and 3
        #[arg(allow_negative_numbers = true)]
        index: i64,
    },
}

pub fn run(command: SlotsCommands) -> Result<(), CliError> {
    let mut ctx = Context::load()?;
    let catalog = ctx.catalog()?;
    let mut slots = ctx.slots(&catalog)?;

    match command {
        SlotsCommands::Show => {
            print_slots(&slots, &catalog);
            Ok(())
        }
        SlotsCommands::Set { slot, index } => {
            let slot = Slot::parse(&slot).ok_or_else(|| {
                CliError::Config(format!("Unknown slot '{}'. Use 1, 2 or 3.", slot))
            })?;

            let change = slots.set_slot(slot, index, catalog.len())?;
            tracing::info!(%slot, index, ?change, "Slot updated");
            ctx.save_slots(&slots)?;

            println!("{}", describe_change(slot, &change));
            print_slots(&slots, &catalog);
            Ok(())
        }
    }
}

fn print_slots(slots: &SlotAssignment, catalog: &Catalog) {
    for slot in Slot::ALL {
        println!("  {}: {}", slot, label(slots.get(slot), catalog));
    }
}

fn label(value: SlotValue, catalog: &Catalog) -> String {
    match value.entry() {
        None => "(none)".to_string(),
        Some(index) => match catalog.get(index) {
            Some(entry) => format!("[{}] {} ({})", index, entry.description, entry.archive_id()),
            None => format!("[{}] (not in catalog)", index),
        },
    }
}

fn describe_change(slot: Slot, change: &SlotChange) -> String {
    match change {
        SlotChange::Applied => format!("Updated {}.", slot),
        SlotChange::Evicted(cleared) => {
            let cleared: Vec<String> = cleared.iter().map(ToString::to_string).collect();
            format!(
                "Updated {}; cleared {} which held the same translation.",
                slot,
                cleared.join(", ")
            )
        }
        SlotChange::ForcedNone => format!(
            "That translation is already in slot1; {} set to none ({}).",
            slot, NONE_VALUE
        ),
        SlotChange::Unchanged => format!("{} already holds that translation.", slot),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amadon::translations::CatalogEntry;

    fn catalog() -> Catalog {
        let entry = |ordinal: usize, description: &str| CatalogEntry {
            ordinal,
            language_id: None,
            description: description.to_string(),
            checksum: None,
        };
        Catalog::from_entries(
            vec![entry(0, "English 2009"), entry(1, "Portuguese Alternative")],
            "test.json",
        )
    }

    #[test]
    fn test_label() {
        let catalog = catalog();
        assert_eq!(label(SlotValue::None, &catalog), "(none)");
        assert_eq!(
            label(SlotValue::Entry(1), &catalog),
            "[1] Portuguese Alternative (TR001)"
        );
        assert_eq!(label(SlotValue::Entry(9), &catalog), "[9] (not in catalog)");
    }

    #[test]
    fn test_describe_eviction() {
        let text = describe_change(Slot::Second, &SlotChange::Evicted(vec![Slot::Third]));
        assert_eq!(
            text,
            "Updated slot2; cleared slot3 which held the same translation."
        );
    }
}
