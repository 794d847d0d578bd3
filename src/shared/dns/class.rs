/// Classes of the domain name system. Only the internet (IN) class is
/// supported by the server, the other ones are decoded only to report
/// precise errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    IN,
    CH,
    HS,
    ANY,
}

impl Class {
    /// Try to generate a [`Class`] from its raw number representation.
    pub fn from_num(n: u16) -> Result<Self, u16> {
        match n {
            1 => Ok(Class::IN),
            3 => Ok(Class::CH),
            4 => Ok(Class::HS),
            255 => Ok(Class::ANY),
            n => Err(n),
        }
    }

    /// Convert a [`Class`] to its raw number representation.
    pub fn to_num(self) -> u16 {
        match self {
            Class::IN => 1,
            Class::CH => 3,
            Class::HS => 4,
            Class::ANY => 255,
        }
    }

    /// Try to generate a [`Class`] from its raw string representation.
    pub fn from_str(s: &str) -> Result<Self, &str> {
        match s {
            "IN" => Ok(Class::IN),
            "CH" => Ok(Class::CH),
            "HS" => Ok(Class::HS),
            "*" => Ok(Class::ANY),
            s => Err(s),
        }
    }

    /// Determine if a [`Class`] is supported in the system.
    pub fn is_supported(self) -> bool {
        matches!(self, Class::IN)
    }
}
