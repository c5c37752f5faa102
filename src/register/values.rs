use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::Serialize;

/// Declares a register value enum together with its display label and a
/// lookup usable as a register unit.
macro_rules! register_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:expr => $label:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive, Serialize)]
        #[repr(u16)]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            pub fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            pub fn lookup(code: i64) -> Option<&'static str> {
                u16::try_from(code)
                    .ok()
                    .and_then(|code| Self::try_from(code).ok())
                    .map(Self::label)
            }

            pub fn from_value(value: &super::Value) -> Option<Self> {
                value
                    .as_code()
                    .and_then(|code| u16::try_from(code).ok())
                    .and_then(|code| Self::try_from(code).ok())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

// {{{ enums
register_enum!(
    /// Status of the attached energy storage.
    StorageStatus {
        Offline = 0 => "Offline",
        Standby = 1 => "Standby",
        Running = 2 => "Running",
        Fault = 3 => "Fault",
        SleepMode = 4 => "Sleep mode",
    }
);

register_enum!(StorageWorkingModesA {
    Unlimited = 0 => "UNLIMITED",
    GridConnectionWithZeroPower = 1 => "GRID_CONNECTION_WITH_ZERO_POWER",
    GridConnectionWithLimitedPower = 2 => "GRID_CONNECTION_WITH_LIMITED_POWER",
});

register_enum!(StorageWorkingModesB {
    None = 0 => "NONE",
    ForcibleChargeDischarge = 1 => "FORCIBLE_CHARGE_DISCHARGE",
    TimeOfUseLg = 2 => "TIME_OF_USE_LG",
    FixedChargeDischarge = 3 => "FIXED_CHARGE_DISCHARGE",
    MaximiseSelfConsumption = 4 => "MAXIMISE_SELF_CONSUMPTION",
    FullyFedToGrid = 5 => "FULLY_FED_TO_GRID",
    TimeOfUseLuna2000 = 6 => "TIME_OF_USE_LUNA2000",
    RemoteSchedulingMaximumSelfUse = 7 => "REMOTE_SCHEDULING_MAXIMUM_SELF_USE",
    RemoteSchedulingFullInternetAccess = 8 => "REMOTE_SCHEDULING_FULL_INTERNET_ACCESS",
    RemoteSchedulingTou = 9 => "REMOTE_SCHEDULING_TOU",
    AiEnergyManagementAndScheduling = 10 => "AI_ENERGY_MANAGEMENT_AND_SCHEDULING",
});

register_enum!(StorageWorkingModesC {
    Adaptive = 0 => "ADAPTIVE",
    FixedChargeDischarge = 1 => "FIXED_CHARGE_DISCHARGE",
    MaximiseSelfConsumption = 2 => "MAXIMISE_SELF_CONSUMPTION",
    TimeOfUseLg = 3 => "TIME_OF_USE_LG",
    FullyFedToGrid = 4 => "FULLY_FED_TO_GRID",
    TimeOfUseLuna2000 = 5 => "TIME_OF_USE_LUNA2000",
});

register_enum!(
    /// Battery family, selects the time-of-use wire layout.
    StorageProductModel {
        None = 0 => "NONE",
        LgResu = 1 => "LG_RESU",
        HuaweiLuna2000 = 2 => "HUAWEI_LUNA2000",
    }
);

register_enum!(StorageForcibleChargeDischarge {
    Stop = 0 => "STOP",
    Charge = 1 => "CHARGE",
    Discharge = 2 => "DISCHARGE",
});

register_enum!(StorageExcessPvEnergyUseInTou {
    FedToGrid = 0 => "FED_TO_GRID",
    Charge = 1 => "CHARGE",
});

register_enum!(ActivePowerControlMode {
    Unlimited = 0 => "UNLIMITED",
    DiActiveScheduling = 1 => "DI_ACTIVE_SCHEDULING",
    ZeroPowerGridConnection = 5 => "ZERO_POWER_GRID_CONNECTION",
    PowerLimitedGridConnectionWatt = 6 => "POWER_LIMITED_GRID_CONNECTION_WATT",
    PowerLimitedGridConnectionPercent = 7 => "POWER_LIMITED_GRID_CONNECTION_PERCENT",
});

register_enum!(MeterStatus {
    Offline = 0 => "OFFLINE",
    Normal = 1 => "NORMAL",
});

register_enum!(MeterType {
    SinglePhase = 0 => "SINGLE_PHASE",
    ThreePhase = 1 => "THREE_PHASE",
});

register_enum!(BackupVoltageIndependentOperation {
    Bv101V = 0 => "BV_101V",
    Bv202V = 1 => "BV_202V",
});

register_enum!(StorageCapacityControlMode {
    Disable = 0 => "DISABLE",
    ActiveCapacityControl = 1 => "ACTIVE_CAPACITY_CONTROL",
});
// }}}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct GridCode {
    pub standard: &'static str,
    pub country: &'static str,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum AlarmLevel {
    Major,
    Minor,
    Warning,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Alarm {
    pub name: &'static str,
    pub id: u16,
    pub level: AlarmLevel,
}

/// Meaning of one bit in a status or alarm bitfield.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BitLabel {
    Flag(&'static str),
    // always reported, one label per state
    OnOff { off: &'static str, on: &'static str },
    Alarm(Alarm),
}

impl BitLabel {
    /// Label contributed for the given bit state, if any.
    pub fn label(&self, set: bool) -> Option<&'static str> {
        match (self, set) {
            (Self::Flag(label), true) => Some(*label),
            (Self::Alarm(alarm), true) => Some(alarm.name),
            (Self::OnOff { on, .. }, true) => Some(*on),
            (Self::OnOff { off, .. }, false) => Some(*off),
            _ => None,
        }
    }
}

const fn alarm(name: &'static str, id: u16, level: AlarmLevel) -> BitLabel {
    BitLabel::Alarm(Alarm { name, id, level })
}

const fn grid(standard: &'static str, country: &'static str) -> GridCode {
    GridCode { standard, country }
}

pub fn grid_code(code: i64) -> Option<GridCode> {
    GRID_CODES
        .iter()
        .find(|(key, _)| i64::from(*key) == code)
        .map(|(_, grid_code)| *grid_code)
}

// {{{ lookup tables
pub static DEVICE_STATUS_DEFINITIONS: &[(u32, &str)] = &[
    (0x0000, "Standby: initializing"),
    (0x0001, "Standby: detecting insulation resistance"),
    (0x0002, "Standby: detecting irradiation"),
    (0x0003, "Standby: grid detecting"),
    (0x0100, "Starting"),
    (0x0200, "On-grid"),
    (0x0201, "Grid Connection: power limited"),
    (0x0202, "Grid Connection: self-derating"),
    (0x0300, "Shutdown: fault"),
    (0x0301, "Shutdown: command"),
    (0x0302, "Shutdown: OVGR"),
    (0x0303, "Shutdown: communication disconnected"),
    (0x0304, "Shutdown: power limited"),
    (0x0305, "Shutdown: manual startup required"),
    (0x0306, "Shutdown: DC switches disconnected"),
    (0x0307, "Shutdown: rapid cutoff"),
    (0x0308, "Shutdown: input underpowered"),
    (0x0401, "Grid scheduling: cosphi-P curve"),
    (0x0402, "Grid scheduling: Q-U curve"),
    (0x0403, "Grid scheduling: PF-U curve"),
    (0x0404, "Grid scheduling: dry contact"),
    (0x0405, "Grid scheduling: Q-P curve"),
    (0x0500, "Spot-check ready"),
    (0x0501, "Spot-checking"),
    (0x0600, "Inspecting"),
    (0x0700, "AFCI self check"),
    (0x0800, "I-V scanning"),
    (0x0900, "DC input detection"),
    (0x0A00, "Running: off-grid charging"),
    (0xA000, "Standby: no irradiation"),
];

pub static GRID_CODES: &[(u16, GridCode)] = &[
    (0, grid("VDE-AR-N-4105", "Germany")),
    (1, grid("NB/T 32004", "China")),
    (2, grid("UTE C 15-712-1(A)", "France")),
    (3, grid("UTE C 15-712-1(B)", "France")),
    (4, grid("UTE C 15-712-1(C)", "France")),
    (5, grid("VDE 0126-1-1-BU", "Bulgary")),
    (6, grid("VDE 0126-1-1-GR(A)", "Greece")),
    (7, grid("VDE 0126-1-1-GR(B)", "Greece")),
    (8, grid("BDEW-MV", "Germany")),
    (9, grid("G59-England", "UK")),
    (10, grid("G59-Scotland", "UK")),
    (11, grid("G83-England", "UK")),
    (12, grid("G83-Scotland", "UK")),
    (13, grid("CEI0-21", "Italy")),
    (14, grid("EN50438-CZ", "Czech Republic")),
    (15, grid("RD1699/661", "Spain")),
    (16, grid("RD1699/661-MV480", "Spain")),
    (17, grid("EN50438-NL", "Netherlands")),
    (18, grid("C10/11", "Belgium")),
    (19, grid("AS4777", "Australia")),
    (20, grid("IEC61727", "General")),
    (21, grid("Custom (50 Hz)", "Custom")),
    (22, grid("Custom (60 Hz)", "Custom")),
    (23, grid("CEI0-16", "Italy")),
    (24, grid("CHINA-MV480", "China")),
    (25, grid("CHINA-MV", "China")),
    (26, grid("TAI-PEA", "Thailand")),
    (27, grid("TAI-MEA", "Thailand")),
    (28, grid("BDEW-MV480", "Germany")),
    (29, grid("Custom MV480 (50 Hz)", "Custom")),
    (30, grid("Custom MV480 (60 Hz)", "Custom")),
    (31, grid("G59-England-MV480", "UK")),
    (32, grid("IEC61727-MV480", "General")),
    (33, grid("UTE C 15-712-1-MV480", "France")),
    (34, grid("TAI-PEA-MV480", "Thailand")),
    (35, grid("TAI-MEA-MV480", "Thailand")),
    (36, grid("EN50438-DK-MV480", "Denmark")),
    (37, grid("Japan standard (50 Hz)", "Japan")),
    (38, grid("Japan standard (60 Hz)", "Japan")),
    (39, grid("EN50438-TR-MV480", "Turkey")),
    (40, grid("EN50438-TR", "Turkey")),
    (41, grid("C11/C10-MV480", "Belgium")),
    (42, grid("Philippines", "Philippines")),
    (43, grid("Philippines-MV480", "Philippines")),
    (44, grid("AS4777-MV480", "Australia")),
    (45, grid("NRS-097-2-1", "South Africa")),
    (46, grid("NRS-097-2-1-MV480", "South Africa")),
    (47, grid("KOREA", "South Korea")),
    (48, grid("IEEE 1547-MV480", "USA")),
    (49, grid("IEC61727-60Hz", "General")),
    (50, grid("IEC61727-60Hz-MV480", "General")),
    (51, grid("CHINA_MV500", "China")),
    (52, grid("ANRE", "Romania")),
    (53, grid("ANRE-MV480", "Romania")),
    (54, grid("ELECTRIC RULE NO.21-MV480", "California, USA")),
    (55, grid("HECO-MV480", "Hawaii, USA")),
    (56, grid("PRC_024_Eastern-MV480", "Eastern USA")),
    (57, grid("PRC_024_Western-MV480", "Western USA")),
    (58, grid("PRC_024_Quebec-MV480", "Quebec, Canada")),
    (59, grid("PRC_024_ERCOT-MV480", "Texas, USA")),
    (60, grid("PO12.3-MV480", "Spain")),
    (61, grid("EN50438_IE-MV480", "Ireland")),
    (62, grid("EN50438_IE", "Ireland")),
    (63, grid("IEEE 1547a-MV480", "USA")),
    (87, grid("EN50549-LV", "Ireland")),
    (92, grid("ABNT NBR 16149", "Brazil")),
    (96, grid("INDIA", "India")),
    (199, grid("Vietnam", "Vietnam")),
    (247, grid("EN50438-SE", "Sweden")),
    (255, grid("Austria", "Austria")),
    (257, grid("G98", "UK")),
    (258, grid("G99-TYPEA-LV", "UK")),
    (268, grid("VDE-AR-N4110", "Germany")),
    (273, grid("NTS", "Spain")),
];

pub static STATE_CODES_1: &[(u32, BitLabel)] = &[
    (0x0001, BitLabel::Flag("Standby")),
    (0x0002, BitLabel::Flag("Grid-Connected")),
    (0x0004, BitLabel::Flag("Grid-Connected normally")),
    (0x0008, BitLabel::Flag("Grid connection with derating due to power rationing")),
    (
        0x0010,
        BitLabel::Flag("Grid connection with derating due to internalcauses of the solar inverter"),
    ),
    (0x0020, BitLabel::Flag("Normal stop")),
    (0x0040, BitLabel::Flag("Stop due to faults")),
    (0x0080, BitLabel::Flag("Stop due to power rationing")),
    (0x0100, BitLabel::Flag("Shutdown")),
    (0x0200, BitLabel::Flag("Spot check")),
];

pub static STATE_CODES_2: &[(u32, BitLabel)] = &[
    (0x0001, BitLabel::OnOff { off: "Locked", on: "Unlocked" }),
    (0x0002, BitLabel::OnOff { off: "PV disconnected", on: "PV connected" }),
    (0x0004, BitLabel::OnOff { off: "No DSP data collection", on: "DSP data collection" }),
];

pub static STATE_CODES_3: &[(u32, BitLabel)] = &[
    (0x0001, BitLabel::OnOff { off: "On-grid", on: "Off-grid" }),
    (
        0x0002,
        BitLabel::OnOff {
            off: "Off-grid switch disabled",
            on: "Off-grid switch enabled",
        },
    ),
];

use AlarmLevel::{Major, Minor, Warning};

pub static ALARM_CODES_1: &[(u32, BitLabel)] = &[
    (0x0001, alarm("High String Input Voltage", 2001, Major)),
    (0x0002, alarm("DC Arc Fault", 2002, Major)),
    (0x0004, alarm("String Reverse Connection", 2011, Major)),
    (0x0008, alarm("String Current Backfeed", 2012, Warning)),
    (0x0010, alarm("Abnormal String Power", 2013, Warning)),
    (0x0020, alarm("AFCI Self-Check Fail", 2021, Major)),
    (0x0040, alarm("Phase Wire Short-Circuited to PE", 2031, Major)),
    (0x0080, alarm("Grid Loss", 2032, Major)),
    (0x0100, alarm("Grid Undervoltage", 2033, Major)),
    (0x0200, alarm("Grid Overvoltage", 2034, Major)),
    (0x0400, alarm("Grid Volt. Imbalance", 2035, Major)),
    (0x0800, alarm("Grid Overfrequency", 2036, Major)),
    (0x1000, alarm("Grid Underfrequency", 2037, Major)),
    (0x2000, alarm("Unstable Grid Frequency", 2038, Major)),
    (0x4000, alarm("Output Overcurrent", 2039, Major)),
    (0x8000, alarm("Output DC Component Overhigh", 2040, Major)),
];

pub static ALARM_CODES_2: &[(u32, BitLabel)] = &[
    (0x0001, alarm("Abnormal Residual Current", 2051, Major)),
    (0x0002, alarm("Abnormal Grounding", 2061, Major)),
    (0x0004, alarm("Low Insulation Resistance", 2062, Major)),
    (0x0008, alarm("Overtemperature", 2063, Minor)),
    (0x0010, alarm("Device Fault", 2064, Major)),
    (0x0020, alarm("Upgrade Failed or Version Mismatch", 2065, Minor)),
    (0x0040, alarm("License Expired", 2066, Warning)),
    (0x0080, alarm("Faulty Monitoring Unit", 61440, Minor)),
    (0x0100, alarm("Faulty Power Collector", 2067, Major)),
    (0x0200, alarm("Battery abnormal", 2068, Minor)),
    (0x0400, alarm("Active Islanding", 2070, Major)),
    (0x0800, alarm("Passive Islanding", 2071, Major)),
    (0x1000, alarm("Transient AC Overvoltage", 2072, Major)),
    (0x2000, alarm("Peripheral port short circuit", 2075, Warning)),
    (0x4000, alarm("Churn output overload", 2077, Major)),
    (0x8000, alarm("Abnormal PV module configuration", 2080, Major)),
];

pub static ALARM_CODES_3: &[(u32, BitLabel)] = &[
    (0x0001, alarm("Optimizer fault", 2081, Warning)),
    (0x0002, alarm("Built-in PID operation abnormal", 2085, Minor)),
    (0x0004, alarm("High input string voltage to ground", 2014, Major)),
    (0x0008, alarm("External Fan Abnormal", 2086, Major)),
    (0x0010, alarm("Battery Reverse Connection", 2069, Major)),
    (0x0020, alarm("On-grid/Off-grid controller abnormal", 2082, Major)),
    (0x0040, alarm("PV String Loss", 2015, Warning)),
    (0x0080, alarm("Internal Fan Abnormal", 2087, Major)),
    (0x0100, alarm("DC Protection Unit Abnormal", 2088, Major)),
];
// }}}
