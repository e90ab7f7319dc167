/// Errors surfaced to callers of the weather service.
///
/// Individual provider failures never appear here; they are logged and
/// folded into [`WeatherError::AllSourcesFailed`].
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Please enter a city name")]
    EmptyQuery,

    #[error("Unable to fetch weather data from any source")]
    AllSourcesFailed,
}
