use teloxide::prelude::*;
use super::WrappedBot as WBot;

use entity::{Command, Prompt};
use rate::Rate;

pub mod bot;
pub mod card;
pub mod entity;
pub mod fsm;
pub mod rate;

mod res;

/// Which purchase flow the deployment runs
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Flow {
    /// Guided /calculate negotiation with amount capture
    Calculator,
    /// Persistent /shop menu pointing at the ticket channel
    Shop,
    Both,
}

impl Flow {
    pub fn calculator(&self) -> bool {
        matches!(self, Self::Calculator | Self::Both)
    }

    pub fn shop(&self) -> bool {
        matches!(self, Self::Shop | Self::Both)
    }

    pub fn offers(&self, command: &Command) -> bool {
        match command {
            Command::Help => true,
            Command::Calculate => self.calculator(),
            Command::Shop | Command::Setup { .. } | Command::Refresh => self.shop(),
        }
    }

    pub fn serves(&self, prompt: Prompt) -> bool {
        match prompt {
            Prompt::Giftability | Prompt::BuyGiftable => self.calculator(),
            Prompt::ShopMenu => self.shop(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub flow: Flow,
    pub rate: Rate,
    /// Where /calculate results send buyers
    pub referral_channel: String,
}
