//! Defines the `WeatherCode` enum, mapping WMO 4677 present-weather codes (as reported by
//! Open-Meteo) to descriptive variants.

/// A WMO weather interpretation code.
///
/// Observation tables and forecasts store the raw integer so that codes outside this
/// enum survive a round trip; use [`WeatherCode::from_i64`] to interpret one.
/// See the [Open-Meteo documentation](https://open-meteo.com/en/docs) for the table.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum WeatherCode {
    /// Code 0: Clear sky.
    ClearSky = 0,
    /// Code 1: Mainly clear.
    MainlyClear = 1,
    /// Code 2: Partly cloudy.
    PartlyCloudy = 2,
    /// Code 3: Overcast.
    Overcast = 3,
    /// Code 45: Fog.
    Fog = 45,
    /// Code 48: Depositing rime fog.
    RimeFog = 48,
    /// Code 51: Light drizzle.
    LightDrizzle = 51,
    /// Code 53: Moderate drizzle.
    Drizzle = 53,
    /// Code 55: Dense drizzle.
    DenseDrizzle = 55,
    /// Code 56: Light freezing drizzle.
    FreezingDrizzle = 56,
    /// Code 57: Dense freezing drizzle.
    DenseFreezingDrizzle = 57,
    /// Code 61: Slight rain.
    SlightRain = 61,
    /// Code 63: Moderate rain.
    Rain = 63,
    /// Code 65: Heavy rain.
    HeavyRain = 65,
    /// Code 66: Light freezing rain.
    FreezingRain = 66,
    /// Code 67: Heavy freezing rain.
    HeavyFreezingRain = 67,
    /// Code 71: Slight snow fall.
    SlightSnowfall = 71,
    /// Code 73: Moderate snow fall.
    Snowfall = 73,
    /// Code 75: Heavy snow fall.
    HeavySnowfall = 75,
    /// Code 77: Snow grains.
    SnowGrains = 77,
    /// Code 80: Slight rain showers.
    SlightRainShowers = 80,
    /// Code 81: Moderate rain showers.
    RainShowers = 81,
    /// Code 82: Violent rain showers.
    ViolentRainShowers = 82,
    /// Code 85: Slight snow showers.
    SnowShowers = 85,
    /// Code 86: Heavy snow showers.
    HeavySnowShowers = 86,
    /// Code 95: Thunderstorm, slight or moderate.
    Thunderstorm = 95,
    /// Code 96: Thunderstorm with slight hail.
    ThunderstormWithHail = 96,
    /// Code 99: Thunderstorm with heavy hail.
    ThunderstormWithHeavyHail = 99,
}

impl WeatherCode {
    /// Attempts to convert an integer WMO code into a `WeatherCode` variant.
    ///
    /// # Returns
    ///
    /// * `Some(WeatherCode)` for a code in the WMO 4677 subset used by Open-Meteo.
    /// * `None` for any other value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use weathercast::WeatherCode;
    ///
    /// assert_eq!(WeatherCode::from_i64(63), Some(WeatherCode::Rain));
    /// assert_eq!(WeatherCode::from_i64(4), None);
    ///
    /// match WeatherCode::from_i64(45) {
    ///     Some(WeatherCode::Fog) => println!("It's foggy!"),
    ///     Some(code) => println!("Weather is: {}", code.description()),
    ///     None => println!("Unknown weather code."),
    /// }
    /// ```
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(WeatherCode::ClearSky),
            1 => Some(WeatherCode::MainlyClear),
            2 => Some(WeatherCode::PartlyCloudy),
            3 => Some(WeatherCode::Overcast),
            45 => Some(WeatherCode::Fog),
            48 => Some(WeatherCode::RimeFog),
            51 => Some(WeatherCode::LightDrizzle),
            53 => Some(WeatherCode::Drizzle),
            55 => Some(WeatherCode::DenseDrizzle),
            56 => Some(WeatherCode::FreezingDrizzle),
            57 => Some(WeatherCode::DenseFreezingDrizzle),
            61 => Some(WeatherCode::SlightRain),
            63 => Some(WeatherCode::Rain),
            65 => Some(WeatherCode::HeavyRain),
            66 => Some(WeatherCode::FreezingRain),
            67 => Some(WeatherCode::HeavyFreezingRain),
            71 => Some(WeatherCode::SlightSnowfall),
            73 => Some(WeatherCode::Snowfall),
            75 => Some(WeatherCode::HeavySnowfall),
            77 => Some(WeatherCode::SnowGrains),
            80 => Some(WeatherCode::SlightRainShowers),
            81 => Some(WeatherCode::RainShowers),
            82 => Some(WeatherCode::ViolentRainShowers),
            85 => Some(WeatherCode::SnowShowers),
            86 => Some(WeatherCode::HeavySnowShowers),
            95 => Some(WeatherCode::Thunderstorm),
            96 => Some(WeatherCode::ThunderstormWithHail),
            99 => Some(WeatherCode::ThunderstormWithHeavyHail),
            _ => None,
        }
    }

    /// The integer code of this variant.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Short human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            WeatherCode::ClearSky => "Clear sky",
            WeatherCode::MainlyClear => "Mainly clear",
            WeatherCode::PartlyCloudy => "Partly cloudy",
            WeatherCode::Overcast => "Overcast",
            WeatherCode::Fog => "Fog",
            WeatherCode::RimeFog => "Depositing rime fog",
            WeatherCode::LightDrizzle => "Light drizzle",
            WeatherCode::Drizzle => "Moderate drizzle",
            WeatherCode::DenseDrizzle => "Dense drizzle",
            WeatherCode::FreezingDrizzle => "Light freezing drizzle",
            WeatherCode::DenseFreezingDrizzle => "Dense freezing drizzle",
            WeatherCode::SlightRain => "Slight rain",
            WeatherCode::Rain => "Moderate rain",
            WeatherCode::HeavyRain => "Heavy rain",
            WeatherCode::FreezingRain => "Light freezing rain",
            WeatherCode::HeavyFreezingRain => "Heavy freezing rain",
            WeatherCode::SlightSnowfall => "Slight snow fall",
            WeatherCode::Snowfall => "Moderate snow fall",
            WeatherCode::HeavySnowfall => "Heavy snow fall",
            WeatherCode::SnowGrains => "Snow grains",
            WeatherCode::SlightRainShowers => "Slight rain showers",
            WeatherCode::RainShowers => "Moderate rain showers",
            WeatherCode::ViolentRainShowers => "Violent rain showers",
            WeatherCode::SnowShowers => "Slight snow showers",
            WeatherCode::HeavySnowShowers => "Heavy snow showers",
            WeatherCode::Thunderstorm => "Thunderstorm",
            WeatherCode::ThunderstormWithHail => "Thunderstorm with slight hail",
            WeatherCode::ThunderstormWithHeavyHail => "Thunderstorm with heavy hail",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_round_trip() {
        for value in [0, 1, 2, 3, 45, 48, 51, 61, 63, 65, 80, 95, 99] {
            let code = WeatherCode::from_i64(value).expect("known code");
            assert_eq!(code.code() as i64, value);
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(WeatherCode::from_i64(4), None);
        assert_eq!(WeatherCode::from_i64(-1), None);
        assert_eq!(WeatherCode::from_i64(100), None);
    }
}
