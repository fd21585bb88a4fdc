/// Coarse weather kind derived from a JMA forecast sentence such as
/// `くもり　時々　雨　所により　雷を伴い　激しく　降る`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeatherType {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Thunderstorm,
    Fog,
}

impl WeatherType {
    /// Keyword match; the most severe phenomenon mentioned wins.
    pub fn from_description(description: &str) -> Self {
        let has = |words: &[&str]| words.iter().any(|w| description.contains(w));
        let cloudy = has(&["くもり", "曇"]);

        if has(&["雷"]) {
            WeatherType::Thunderstorm
        } else if has(&["雪", "みぞれ"]) {
            WeatherType::Snow
        } else if has(&["雨"]) {
            WeatherType::Rain
        } else if has(&["霧"]) {
            WeatherType::Fog
        } else if cloudy && has(&["晴"]) {
            WeatherType::PartlyCloudy
        } else if cloudy {
            WeatherType::Cloudy
        } else {
            WeatherType::Clear
        }
    }
}
