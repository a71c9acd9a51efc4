use enum_map::Enum;
use strum::{Display, EnumIter, EnumString};


// Wire and display form is upper case: "WHITE", "BLACK".
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Enum, EnumIter, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Force {
    White,
    Black,
}

impl Force {
    pub fn opponent(self) -> Force {
        match self {
            Force::White => Force::Black,
            Force::Black => Force::White,
        }
    }

    // Direction of pawn advance along the y axis.
    pub fn forward(self) -> i8 {
        match self {
            Force::White => 1,
            Force::Black => -1,
        }
    }
}
