//! Command states and their raw controller codes.

/// Raw state codes as the surrounding BIOS event layer stores them.
///
/// The event layer advances multi-step sequences (seek-then-read, reinit)
/// by writing these codes back into the driver context, so the numeric
/// values are part of the observable contract.
pub const RAW_GETSTATUS: u16 = 0x0001;
pub const RAW_SETMODE: u16 = 0x000E;
pub const RAW_SEEKL: u16 = 0x0015;
pub const RAW_SEEKP: u16 = 0x0016;
pub const RAW_SEEKL_SETLOC: u16 = 0x00F2;
pub const RAW_READN: u16 = 0x00F6;
pub const RAW_READS: u16 = 0x00FB;
pub const RAW_READ_SETMODE: u16 = 0x00FE;
pub const RAW_INITIALIZING: u16 = 0x0CCC;
pub const RAW_GOT_ERROR_AND_REINIT: u16 = 0x0DDD;
pub const RAW_PAUSING: u16 = 0x0FFF;
pub const RAW_IDLE: u16 = 0xFFFF;

/// The one outstanding command the driver is tracking.
///
/// `Unknown` carries reverse-engineered controller codes with no documented
/// meaning (0xE6/0xEB, plus the audio sub-codes 3/4/5 the data-ready
/// handler recognizes). They are kept as explicit raw arms rather than
/// folded into an "other" bucket so undocumented opcodes survive a
/// round-trip through the event layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Idle,
    GetStatus,
    SetMode,
    SeekL,
    SeekP,
    SeekLSetLoc,
    ReadN,
    ReadS,
    ReadSetMode,
    Initializing,
    GotErrorAndReinit,
    Pausing,
    Unknown(u16),
}

impl CommandState {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            RAW_GETSTATUS => Self::GetStatus,
            RAW_SETMODE => Self::SetMode,
            RAW_SEEKL => Self::SeekL,
            RAW_SEEKP => Self::SeekP,
            RAW_SEEKL_SETLOC => Self::SeekLSetLoc,
            RAW_READN => Self::ReadN,
            RAW_READS => Self::ReadS,
            RAW_READ_SETMODE => Self::ReadSetMode,
            RAW_INITIALIZING => Self::Initializing,
            RAW_GOT_ERROR_AND_REINIT => Self::GotErrorAndReinit,
            RAW_PAUSING => Self::Pausing,
            RAW_IDLE => Self::Idle,
            other => Self::Unknown(other),
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            Self::GetStatus => RAW_GETSTATUS,
            Self::SetMode => RAW_SETMODE,
            Self::SeekL => RAW_SEEKL,
            Self::SeekP => RAW_SEEKP,
            Self::SeekLSetLoc => RAW_SEEKL_SETLOC,
            Self::ReadN => RAW_READN,
            Self::ReadS => RAW_READS,
            Self::ReadSetMode => RAW_READ_SETMODE,
            Self::Initializing => RAW_INITIALIZING,
            Self::GotErrorAndReinit => RAW_GOT_ERROR_AND_REINIT,
            Self::Pausing => RAW_PAUSING,
            Self::Idle => RAW_IDLE,
            Self::Unknown(raw) => raw,
        }
    }

    /// The two undocumented controller states a seek may preempt.
    pub fn is_undocumented(self) -> bool {
        matches!(self, Self::Unknown(0xE6) | Self::Unknown(0xEB))
    }

    pub fn is_read(self) -> bool {
        matches!(self, Self::ReadN | Self::ReadS)
    }
}
