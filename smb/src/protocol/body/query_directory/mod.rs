mod information_class;

pub type SMBInformationClass = information_class::SMBInformationClass;
pub type LegacyInformationLevel = information_class::LegacyInformationLevel;
pub type InfoLevel = information_class::InfoLevel;
