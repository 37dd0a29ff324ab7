//! Per-pixel quality flags written to the `case2_flags` band.

use std::fmt;

/// Named bits of the `case2_flags` band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QualityFlag {
    WlrOutOfScope = 0,
    ConcentrationOutOfRange = 1,
    OutOfTrainingRange = 2,
    Whitecaps = 3,
    FitFailed = 4,
    Invalid = 5,
}

impl QualityFlag {
    pub const ALL: [QualityFlag; 6] = [
        QualityFlag::WlrOutOfScope,
        QualityFlag::ConcentrationOutOfRange,
        QualityFlag::OutOfTrainingRange,
        QualityFlag::Whitecaps,
        QualityFlag::FitFailed,
        QualityFlag::Invalid,
    ];

    pub fn bit_index(self) -> u8 {
        self as u8
    }

    pub fn mask(self) -> u8 {
        1 << self.bit_index()
    }

    /// Flag name inside the flag coding
    pub fn name(self) -> &'static str {
        match self {
            QualityFlag::WlrOutOfScope => "WLR_OOR",
            QualityFlag::ConcentrationOutOfRange => "CONC_OOR",
            QualityFlag::OutOfTrainingRange => "OOTR",
            QualityFlag::Whitecaps => "WHITECAPS",
            QualityFlag::FitFailed => "FIT_FAILED",
            QualityFlag::Invalid => "INVALID",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            QualityFlag::WlrOutOfScope => "WLR out of scope",
            QualityFlag::ConcentrationOutOfRange => "Concentration out of training range",
            QualityFlag::OutOfTrainingRange => "RLw out of training range",
            QualityFlag::Whitecaps => "Whitecaps pixels",
            QualityFlag::FitFailed => "Fit failed",
            QualityFlag::Invalid => "not valid",
        }
    }
}

impl fmt::Display for QualityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Set of [`QualityFlag`]s backed by one byte.
///
/// Flags can only be raised; nothing clears a bit once it is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct QualityFlags(u8);

impl QualityFlags {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn raise(&mut self, flag: QualityFlag) {
        self.0 |= flag.mask();
    }

    pub fn raise_if(&mut self, flag: QualityFlag, condition: bool) {
        if condition {
            self.raise(flag);
        }
    }

    pub fn contains(&self, flag: QualityFlag) -> bool {
        self.0 & flag.mask() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = QualityFlag> + '_ {
        QualityFlag::ALL
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }

}

impl From<QualityFlag> for QualityFlags {
    fn from(flag: QualityFlag) -> Self {
        let mut flags = QualityFlags::new();
        flags.raise(flag);
        flags
    }
}

impl fmt::Display for QualityFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(QualityFlag::name).collect();
        write!(f, "{:#04x} [{}]", self.0, names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_positions() {
        assert_eq!(QualityFlag::WlrOutOfScope.mask(), 0x01);
        assert_eq!(QualityFlag::ConcentrationOutOfRange.mask(), 0x02);
        assert_eq!(QualityFlag::OutOfTrainingRange.mask(), 0x04);
        assert_eq!(QualityFlag::Whitecaps.mask(), 0x08);
        assert_eq!(QualityFlag::FitFailed.mask(), 0x10);
        assert_eq!(QualityFlag::Invalid.mask(), 0x20);
    }

    #[test]
    fn test_raise_is_monotonic() {
        let mut flags = QualityFlags::new();
        assert!(flags.is_empty());

        flags.raise(QualityFlag::Whitecaps);
        flags.raise_if(QualityFlag::FitFailed, false);
        flags.raise(QualityFlag::Whitecaps);
        assert_eq!(flags.bits(), 0x08);

        flags.raise_if(QualityFlag::OutOfTrainingRange, true);
        assert!(flags.contains(QualityFlag::Whitecaps));
        assert!(flags.contains(QualityFlag::OutOfTrainingRange));
        assert!(!flags.contains(QualityFlag::Invalid));
        assert_eq!(flags.bits(), 0x0c);
    }

    #[test]
    fn test_descriptions_and_display() {
        let mut flags = QualityFlags::from(QualityFlag::Invalid);
        flags.raise(QualityFlag::WlrOutOfScope);

        let descriptions: Vec<&str> = flags.iter().map(QualityFlag::description).collect();
        assert_eq!(descriptions, vec!["WLR out of scope", "not valid"]);
        assert_eq!(flags.to_string(), "0x21 [WLR_OOR, INVALID]");
        assert_eq!(QualityFlags::new().to_string(), "0x00 []");
    }
}
