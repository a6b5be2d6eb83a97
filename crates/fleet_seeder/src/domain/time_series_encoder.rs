use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, TimeDelta, Utc};
use common::domain::{DomainError, DomainResult, HistoryPoint};
use rand::Rng;

/// Bytes per record: little-endian i64 epoch milliseconds, then little-endian f64 value.
pub const RECORD_SIZE: usize = 16;

/// Synthesized values are uniform in `[0, VALUE_RANGE)`.
pub const VALUE_RANGE: f64 = 100.0;

/// Encoder for the day-blob wire format.
///
/// ```text
/// record  := int64_le(timestamp_ms_since_epoch) ++ float64_le(value)
/// payload := record*, one record per minute in [start, end)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesEncoder;

impl TimeSeriesEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Synthesize one record per minute boundary in `[start, end)`.
    ///
    /// Returns an empty payload when `end <= start`.
    pub fn encode<R: Rng + ?Sized>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        rng: &mut R,
    ) -> Bytes {
        if end <= start {
            return Bytes::new();
        }

        let minutes = (end - start).num_minutes().max(0) as usize + 1;
        let mut buf = BytesMut::with_capacity(minutes * RECORD_SIZE);

        let step = TimeDelta::minutes(1);
        let mut minute = start;
        while minute < end {
            buf.put_i64_le(minute.timestamp_millis());
            buf.put_f64_le(rng.gen::<f64>() * VALUE_RANGE);
            minute += step;
        }

        buf.freeze()
    }

    /// Parse a payload back into its points, preserving the exact f64 bit patterns.
    pub fn decode(&self, payload: &[u8]) -> DomainResult<Vec<HistoryPoint>> {
        if payload.len() % RECORD_SIZE != 0 {
            return Err(DomainError::MalformedPayload { len: payload.len() });
        }

        let mut cursor = payload;
        let mut points = Vec::with_capacity(payload.len() / RECORD_SIZE);
        while cursor.has_remaining() {
            let millis = cursor.get_i64_le();
            let value = cursor.get_f64_le();
            let timestamp = DateTime::from_timestamp_millis(millis)
                .ok_or(DomainError::TimestampOutOfRange(millis))?;
            points.push(HistoryPoint { timestamp, value });
        }

        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::domain::MINUTES_PER_DAY;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_full_day_has_one_record_per_minute() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();
        let end = start + TimeDelta::days(1);

        let payload = encoder.encode(start, end, &mut StdRng::seed_from_u64(1));
        assert_eq!(payload.len(), MINUTES_PER_DAY * RECORD_SIZE);

        let points = encoder.decode(&payload).unwrap();
        assert_eq!(points.len(), MINUTES_PER_DAY);
        assert_eq!(points.first().unwrap().timestamp, start);
        assert_eq!(
            points.last().unwrap().timestamp,
            end - TimeDelta::minutes(1)
        );
        for pair in points.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, TimeDelta::minutes(1));
        }
    }

    #[test]
    fn test_values_within_range() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();
        let payload = encoder.encode(
            start,
            start + TimeDelta::hours(6),
            &mut StdRng::seed_from_u64(9),
        );

        let points = encoder.decode(&payload).unwrap();
        assert_eq!(points.len(), 360);
        assert!(points.iter().all(|p| (0.0..VALUE_RANGE).contains(&p.value)));
    }

    #[test]
    fn test_empty_or_inverted_window_yields_empty_payload() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();
        let mut rng = StdRng::seed_from_u64(3);

        assert!(encoder.encode(start, start, &mut rng).is_empty());
        assert!(encoder
            .encode(start, start - TimeDelta::minutes(5), &mut rng)
            .is_empty());
    }

    #[test]
    fn test_record_layout_is_little_endian() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();
        let payload = encoder.encode(
            start,
            start + TimeDelta::minutes(1),
            &mut StdRng::seed_from_u64(5),
        );

        assert_eq!(payload.len(), RECORD_SIZE);
        let millis = i64::from_le_bytes(payload[..8].try_into().unwrap());
        assert_eq!(millis, 1_704_067_200_000);

        let value = f64::from_le_bytes(payload[8..].try_into().unwrap());
        let expected: f64 = StdRng::seed_from_u64(5).gen::<f64>() * VALUE_RANGE;
        assert_eq!(value.to_bits(), expected.to_bits());
    }

    #[test]
    fn test_decode_recovers_generated_values_bit_exact() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();

        let payload = encoder.encode(
            start,
            start + TimeDelta::minutes(30),
            &mut StdRng::seed_from_u64(11),
        );
        let points = encoder.decode(&payload).unwrap();

        let mut replay = StdRng::seed_from_u64(11);
        for (i, point) in points.iter().enumerate() {
            let expected = replay.gen::<f64>() * VALUE_RANGE;
            assert_eq!(point.timestamp, start + TimeDelta::minutes(i as i64));
            assert_eq!(point.value.to_bits(), expected.to_bits());
        }
    }

    #[test]
    fn test_same_seed_same_payload() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();
        let end = start + TimeDelta::hours(1);

        let a = encoder.encode(start, end, &mut StdRng::seed_from_u64(21));
        let b = encoder.encode(start, end, &mut StdRng::seed_from_u64(21));
        assert_eq!(a, b);
    }

    #[test]
    fn test_partial_minute_window_rounds_up() {
        let encoder = TimeSeriesEncoder::new();
        let start = day_start();
        let end = start + TimeDelta::seconds(90);

        let points = encoder
            .decode(&encoder.encode(start, end, &mut StdRng::seed_from_u64(2)))
            .unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let encoder = TimeSeriesEncoder::new();
        let result = encoder.decode(&[0u8; RECORD_SIZE + 3]);
        assert!(matches!(
            result,
            Err(DomainError::MalformedPayload { len }) if len == RECORD_SIZE + 3
        ));
    }

    #[test]
    fn test_decode_empty_payload() {
        let encoder = TimeSeriesEncoder::new();
        assert!(encoder.decode(&[]).unwrap().is_empty());
    }
}
