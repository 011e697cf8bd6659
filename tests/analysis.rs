// End-to-end checks of the analysis pipeline over synthetic bar sequences.

use chrono::NaiveDate;
use stocklens::engine::divergence::DivergenceKind;
use stocklens::engine::fractal::FractalClass;
use stocklens::engine::runs::Direction;
use stocklens::engine::{analyze, PricePoint};

/// Flat-bodied daily bars, one per day starting 2024-01-01, stamped at the
/// session close.
fn daily_bars(closes: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint {
            date: start
                .checked_add_days(chrono::Days::new(i as u64))
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            open: c,
            high: c,
            low: c,
            close: c,
            amount: 1_000_000.0,
        })
        .collect()
}

#[test]
fn constant_series_stays_at_sentinels() {
    let prices = daily_bars(&[25.0; 40]);
    let analysis = analyze(&prices).unwrap();

    for (i, value) in analysis.indicators.iter().enumerate() {
        // The MACD fast line never leaves zero on a constant series.
        assert_eq!(value.macd_dif, 0.0, "dif nonzero at index {i}");
        // Bollinger bands collapse onto the middle line once warmed up.
        if i >= 19 {
            assert_eq!(value.ma20, 25.0);
            assert!((value.boll_up - value.boll_mid).abs() < 0.011);
            assert!((value.boll_mid - value.boll_down).abs() < 0.011);
        } else {
            assert_eq!(value.ma20, 0.0);
        }
        // A zero-range window makes the stochastic degenerate, not NaN.
        assert!(value.kdj_k.is_finite());
        assert!(value.kdj_j.is_finite());
    }

    // No structure in a flat series.
    assert!(analysis.trend.runs.is_empty());
    assert!(analysis.trend.pivots.is_empty());
    assert!(analysis.trend.divergences.is_empty());
}

#[test]
fn monotonic_rise_is_one_bottom_leg() {
    let closes: Vec<f64> = (1..=80).map(|v| 10.0 + v as f64 * 0.5).collect();
    let analysis = analyze(&daily_bars(&closes)).unwrap();

    assert_eq!(analysis.trend.runs.len(), 1);
    assert_eq!(analysis.trend.runs[0].direction, Direction::Up);

    assert_eq!(analysis.trend.fractals.len(), 1);
    assert_eq!(analysis.trend.fractals[0].class, FractalClass::Bottom);

    // One leg cannot overlap with anything.
    assert!(analysis.trend.pivots.is_empty());
    assert!(analysis.trend.divergences.is_empty());

    // MAs order themselves below the close in an uptrend.
    let last = analysis.indicators.last().unwrap();
    assert!(last.ma5 > last.ma10);
    assert!(last.ma10 > last.ma20);
    assert!(last.ma20 > last.ma30);
    assert!(last.ma30 > last.ma60);
}

#[test]
fn oscillating_band_forms_a_pivot_zone() {
    // Descend into a band, then swing inside it repeatedly.
    let mut closes = vec![30.0, 28.0, 26.0, 24.0, 22.0, 20.0];
    for _ in 0..5 {
        closes.extend([21.0, 22.0, 23.0, 24.0, 25.0]);
        closes.extend([24.0, 23.0, 22.0, 21.0, 20.0]);
    }
    let analysis = analyze(&daily_bars(&closes)).unwrap();

    assert!(analysis.trend.fractals.len() >= 3);
    assert_eq!(analysis.trend.pivots.len(), 1);

    let zone = &analysis.trend.pivots[0];
    assert!(zone.low <= zone.high);
    assert!(zone.start < zone.end);

    // Adjacent fractals always share their boundary bar.
    for pair in analysis.trend.fractals.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
    }
}

#[test]
fn stacked_falling_boxes_give_a_descending_context() {
    // Sell-off into a consolidation box, breakdown into a strictly lower box,
    // then a marginal new low and a rebound. The zone sequence descends, so
    // the trend context is fixed and only buy-side points may come out.
    let mut closes: Vec<f64> = (0..8).map(|i| 60.0 - 2.0 * i as f64).collect();
    for _ in 0..3 {
        closes.extend([41.0, 42.0, 43.0, 44.0, 45.0]);
        closes.extend([44.0, 43.0, 42.0, 41.0, 40.0]);
    }
    closes.extend((0..5).map(|i| 39.0 - 2.0 * i as f64));
    for _ in 0..3 {
        closes.extend([31.0, 32.0, 33.0, 34.0, 35.0]);
        closes.extend([34.0, 33.0, 32.0, 31.0, 30.0]);
    }
    closes.extend((0..6).map(|i| 29.8 - 0.3 * i as f64));
    closes.extend((0..5).map(|i| 29.0 + 1.5 * i as f64));
    let analysis = analyze(&daily_bars(&closes)).unwrap();

    let pivots = &analysis.trend.pivots;
    assert!(pivots.len() >= 2, "expected stacked zones, got {}", pivots.len());
    // The second zone sits strictly below the first.
    assert!(pivots[1].low < pivots[0].low);

    for point in &analysis.trend.divergences {
        assert!(
            matches!(point.kind, DivergenceKind::Buy1 | DivergenceKind::Buy2),
            "sell-side point {} in a descending context",
            point.kind
        );
        // Points anchor inside the lowest box, not the first one.
        assert!(point.index > pivots.last().unwrap().start);
    }
}

#[test]
fn stacked_rising_boxes_give_an_ascending_context() {
    // Mirror of the descending case: two consolidation boxes stacked upward
    // with a marginal higher high at the end. Only sell-side points allowed.
    let mut closes: Vec<f64> = (0..8).map(|i| 20.0 + 2.0 * i as f64).collect();
    for _ in 0..3 {
        closes.extend([39.0, 38.0, 37.0, 36.0, 35.0]);
        closes.extend([36.0, 37.0, 38.0, 39.0, 40.0]);
    }
    closes.extend((0..5).map(|i| 41.0 + 2.0 * i as f64));
    for _ in 0..3 {
        closes.extend([49.0, 48.0, 47.0, 46.0, 45.0]);
        closes.extend([46.0, 47.0, 48.0, 49.0, 50.0]);
    }
    closes.extend((0..6).map(|i| 50.2 + 0.3 * i as f64));
    closes.extend((0..5).map(|i| 51.0 - 1.5 * i as f64));
    let analysis = analyze(&daily_bars(&closes)).unwrap();

    let pivots = &analysis.trend.pivots;
    assert!(pivots.len() >= 2, "expected stacked zones, got {}", pivots.len());
    assert!(pivots[1].low > pivots[0].low);

    for point in &analysis.trend.divergences {
        assert!(
            matches!(point.kind, DivergenceKind::Sell1 | DivergenceKind::Sell2),
            "buy-side point {} in an ascending context",
            point.kind
        );
    }
}

#[test]
fn divergence_signals_index_into_the_series() {
    // A long decline in two legs, the second reaching a lower low, with a
    // consolidation between them.
    let mut closes: Vec<f64> = (0..20).map(|i| 60.0 - 1.5 * i as f64).collect();
    for _ in 0..4 {
        closes.extend([31.0, 32.0, 33.0, 34.0, 35.0]);
        closes.extend([34.0, 33.0, 32.0, 31.0, 30.0]);
    }
    closes.extend((1..=15).map(|i| 30.0 - 0.4 * i as f64));
    let prices = daily_bars(&closes);
    let analysis = analyze(&prices).unwrap();

    for point in &analysis.trend.divergences {
        assert!(point.index < prices.len(), "signal index out of range");
        let label = point.kind.to_string();
        assert!(
            matches!(
                point.kind,
                DivergenceKind::Buy1
                    | DivergenceKind::Buy2
                    | DivergenceKind::Buy3
                    | DivergenceKind::Sell1
                    | DivergenceKind::Sell2
                    | DivergenceKind::Sell3
            ),
            "unexpected kind {label}"
        );
    }
}

#[test]
fn analysis_lengths_always_agree() {
    let closes: Vec<f64> = (0..120)
        .map(|i| 20.0 + ((i * 11) % 17) as f64 * 0.4)
        .collect();
    let prices = daily_bars(&closes);
    let analysis = analyze(&prices).unwrap();

    assert_eq!(analysis.indicators.len(), prices.len());
    if let (Some(first), Some(last)) = (
        analysis.trend.runs.first(),
        analysis.trend.runs.last(),
    ) {
        assert!(first.start < prices.len());
        assert!(last.end < prices.len());
    }
}

#[test]
fn rejects_unsorted_input() {
    let mut prices = daily_bars(&[1.0, 2.0, 3.0]);
    prices.reverse();
    assert!(analyze(&prices).is_err());
}
