//! Chat content pools with selection weights.
use crate::economy::Sentiment;
use crate::rng::RandomSource;

use super::ThreatCategory;

pub(crate) struct NormalLine {
    pub text: &'static str,
    pub sentiment: Sentiment,
    pub weight: u32,
}

pub(crate) struct ThreatLine {
    pub text: &'static str,
    pub category: ThreatCategory,
    pub weight: u32,
}

const fn normal(text: &'static str, sentiment: Sentiment, weight: u32) -> NormalLine {
    NormalLine {
        text,
        sentiment,
        weight,
    }
}

const fn threat(text: &'static str, category: ThreatCategory, weight: u32) -> ThreatLine {
    ThreatLine {
        text,
        category,
        weight,
    }
}

use Sentiment::{Negative, Neutral, Positive};
use ThreatCategory::{Dox, HateSpeech};

pub(crate) const NORMAL_LINES: &[NormalLine] = &[
    normal("Hi everyone! 👋", Positive, 3),
    normal("This is so fun!", Positive, 3),
    normal("PogChamp", Positive, 2),
    normal("Love your content!", Positive, 3),
    normal("First time watching, this is great", Positive, 2),
    normal("lol that was hilarious", Positive, 2),
    normal("Can you say hi to me?? 🥺", Neutral, 2),
    normal("GG", Neutral, 3),
    normal("lets goooo", Positive, 2),
    normal("anyone else from Japan?", Neutral, 2),
    normal("KEKW", Neutral, 2),
    normal("Hello from Brazil! 🇧🇷", Positive, 2),
    normal("your voice is so soothing", Positive, 2),
    normal("stream more pls!!", Positive, 2),
    normal("Gave my sub today 💜", Positive, 1),
    normal("LOL", Neutral, 3),
    normal("big fan since day 1", Positive, 1),
    normal("this stream is amazing", Positive, 2),
    normal("who else is watching at 3am", Neutral, 2),
    normal("so cute!!", Positive, 2),
    normal("can we get a song?", Neutral, 2),
    normal("W stream", Positive, 2),
    normal("chat is moving so fast", Neutral, 2),
    normal("😂😂😂", Neutral, 2),
    normal("sending love from Europe!", Positive, 2),
    normal("OMG that was so good", Positive, 2),
    normal("yoooo", Neutral, 2),
    normal("hey chat!", Neutral, 3),
    normal("vibing 🎵", Positive, 2),
    normal("this is my fav stream", Positive, 1),
    normal("audio is kinda quiet today", Negative, 2),
    normal("this game is boring ngl", Negative, 2),
    normal("why is the stream lagging", Negative, 2),
    normal("meh", Negative, 1),
];

pub(crate) const THREAT_LINES: &[ThreatLine] = &[
    threat("You're so ugly, why do you even stream", HateSpeech, 2),
    threat("Nobody likes you, just quit already", HateSpeech, 2),
    threat("Go away loser, nobody asked", HateSpeech, 2),
    threat("You're the worst streamer I've ever seen", HateSpeech, 2),
    threat("Untalented hack, stop streaming", HateSpeech, 2),
    threat("kys honestly", HateSpeech, 1),
    threat("I found your address: 123 Maple Street", Dox, 1),
    threat("Your real name is Sarah right? I looked it up", Dox, 1),
    threat("I know where you live, 456 Oak Avenue", Dox, 1),
    threat("Isn't your phone number 555-0142?", Dox, 1),
];

pub(crate) const USERNAMES: &[&str] = &[
    "xXGamerXx",
    "CuteViewer42",
    "StreamFan99",
    "NightOwl_",
    "PixelDream",
    "ChatLurker",
    "HypeSquad7",
    "Moonbeam22",
    "VibeCheck_",
    "StarGazer88",
    "CozyVibes",
    "CloudNine",
    "SunnyDay_",
    "AquaMarine",
    "GlowUp100",
    "NekoFan_",
    "BreezeWave",
    "Sparkle55",
    "ChillZone",
    "LunaLight",
];

pub(crate) const USERNAME_COLORS: &[&str] = &[
    "#ff7eb3", "#7eb3ff", "#7eff9e", "#ffe07e", "#c07eff", "#ff7e7e", "#7edcff", "#ffb87e",
    "#7effea", "#e8ff7e",
];

/// Pick an entry with probability proportional to its weight.
pub(crate) fn pick_weighted<'a, T>(
    entries: &'a [T],
    weight: impl Fn(&T) -> u32,
    rng: &mut dyn RandomSource,
) -> Option<&'a T> {
    let total: u32 = entries.iter().map(&weight).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.next_unit() * f64::from(total);
    for entry in entries {
        let w = f64::from(weight(entry));
        if roll < w {
            return Some(entry);
        }
        roll -= w;
    }
    entries.iter().rev().find(|entry| weight(entry) > 0)
}

pub(crate) fn pick_username(rng: &mut dyn RandomSource) -> &'static str {
    USERNAMES[rng.pick_index(USERNAMES.len())]
}

pub(crate) fn pick_color(rng: &mut dyn RandomSource) -> &'static str {
    USERNAME_COLORS[rng.pick_index(USERNAME_COLORS.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::ScriptedRandom;

    #[test]
    fn weighted_pick_respects_boundaries() {
        let entries = [("a", 1_u32), ("b", 0), ("c", 3)];
        let mut rng = ScriptedRandom::new([0.0, 0.24, 0.25, 0.999], 0.5);
        let mut pick = || pick_weighted(&entries, |e| e.1, &mut rng).map(|e| e.0);
        assert_eq!(pick(), Some("a"));
        assert_eq!(pick(), Some("a"));
        assert_eq!(pick(), Some("c"));
        assert_eq!(pick(), Some("c"));
    }

    #[test]
    fn empty_weights_pick_nothing() {
        let entries = [("a", 0_u32)];
        let mut rng = ScriptedRandom::constant(0.3);
        assert!(pick_weighted(&entries, |e| e.1, &mut rng).is_none());
    }

    #[test]
    fn pools_are_populated() {
        assert!(NORMAL_LINES.iter().any(|l| l.sentiment == Sentiment::Negative));
        assert!(THREAT_LINES.iter().any(|l| l.category == ThreatCategory::Dox));
        let mut rng = ScriptedRandom::constant(0.999);
        assert_eq!(pick_username(&mut rng), "LunaLight");
        assert_eq!(pick_color(&mut rng), "#e8ff7e");
    }
}
