//! Reader tests against synthetic NDFD-shaped messages.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{TimeZone, Utc};
use grib2_parser::{Grib2Error, Grib2Reader, Grib2Tables, GridGeometry};
use test_utils::{
    alaska, assert_approx_eq, concat_messages, create_grid_with_nans, create_temperature_grid,
    require_test_file, NdfdMessageBuilder,
};

fn reader(bytes: Vec<u8>) -> Grib2Reader {
    Grib2Reader::new(Bytes::from(bytes), Arc::new(Grib2Tables::ndfd()))
}

#[test]
fn test_tmax_message_sections() {
    let bytes = NdfdMessageBuilder::new_tmax().with_forecast_hour(18).build();
    let message = reader(bytes).next_message().unwrap().unwrap();

    assert_eq!(message.indicator.edition, 2);
    assert_eq!(message.identification.center, 8);
    assert_eq!(message.parameter(), "TMAX");
    assert_eq!(message.grid_dims(), (3, 4));
    assert_eq!(message.product_definition.template, 8);

    let reference = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
    assert_eq!(message.identification.reference_time, reference);
    assert_eq!(
        message.valid_start(),
        Some(Utc.with_ymd_and_hms(2024, 6, 11, 6, 0, 0).unwrap())
    );
    assert_eq!(
        message.valid_end(),
        Some(Utc.with_ymd_and_hms(2024, 6, 11, 18, 0, 0).unwrap())
    );
    assert_eq!(message.product_definition.interval.as_ref().unwrap().process, 2);
}

#[test]
fn test_polar_stereographic_geometry() {
    let bytes = NdfdMessageBuilder::new_tmax().build();
    let message = reader(bytes).next_message().unwrap().unwrap();

    match message.grid_definition.geometry {
        GridGeometry::PolarStereographic {
            la1,
            lo1,
            lad,
            lov,
            dx_m,
            south_pole,
            ..
        } => {
            assert_approx_eq!(la1, alaska::LA1, 1e-6);
            assert_approx_eq!(lo1, alaska::LO1, 1e-6);
            assert_approx_eq!(lad, alaska::LAD, 1e-6);
            assert_approx_eq!(lov, alaska::LOV, 1e-6);
            assert_approx_eq!(dx_m, alaska::DX_M, 1e-3);
            assert!(!south_pole);
        }
        other => panic!("unexpected geometry {:?}", other),
    }
    assert_approx_eq!(message.grid_definition.earth_radius_m, alaska::EARTH_RADIUS_M, 1.0);
}

#[test]
fn test_negative_latlon_corner() {
    let bytes = NdfdMessageBuilder::new_rh()
        .with_latlon_grid(71.0, -170.0, 0.5, 0.5)
        .build();
    let message = reader(bytes).next_message().unwrap().unwrap();

    assert_eq!(message.parameter(), "RH");
    assert_eq!(message.product_definition.template, 0);
    assert!(message.valid_end().is_none());
    match message.grid_definition.geometry {
        GridGeometry::LatLon { la1, lo1, la2, lo2, .. } => {
            assert_approx_eq!(la1, 71.0, 1e-6);
            assert_approx_eq!(lo1, -170.0, 1e-6);
            assert_approx_eq!(la2, 70.0, 1e-6);
            assert_approx_eq!(lo2, -168.5, 1e-6);
        }
        other => panic!("unexpected geometry {:?}", other),
    }
}

#[test]
fn test_unpack_gradient() {
    let data = create_temperature_grid(4, 3);
    let bytes = NdfdMessageBuilder::new_tmax()
        .with_data(data.clone())
        .build();
    let values = reader(bytes)
        .next_message()
        .unwrap()
        .unwrap()
        .unpack_data()
        .unwrap();

    assert_eq!(values.len(), data.len());
    for (got, want) in values.iter().zip(&data) {
        assert_approx_eq!(*got, *want, 0.01);
    }
}

#[test]
fn test_bitmap_missing_points_are_nan() {
    let data = create_grid_with_nans(4, 3, 12.5, &[(0, 0), (3, 2)]);
    let bytes = NdfdMessageBuilder::new_wind().with_data(data).build();
    let message = reader(bytes).next_message().unwrap().unwrap();
    assert!(message.bitmap.is_some());

    let values = message.unpack_data().unwrap();
    assert!(values[0].is_nan());
    assert!(values[11].is_nan());
    assert_eq!(values.iter().filter(|v| v.is_nan()).count(), 2);
    assert_approx_eq!(values[5], 12.5, 0.01);
}

#[test]
fn test_multi_message_file_keeps_order() {
    let hours = [2u32, 26, 50];
    let messages: Vec<Vec<u8>> = hours
        .iter()
        .map(|&h| NdfdMessageBuilder::new_tmax().with_forecast_hour(h).build())
        .collect();

    let (parsed, error) = reader(concat_messages(&messages)).read_all();
    assert!(error.is_none());
    let forecast: Vec<u32> = parsed
        .iter()
        .map(|m| m.product_definition.forecast_time)
        .collect();
    assert_eq!(forecast, hours);
}

#[test]
fn test_truncated_tail_keeps_leading_messages() {
    let first = NdfdMessageBuilder::new_tmax().build();
    let second = NdfdMessageBuilder::new_tmax().with_forecast_hour(24).build();
    let mut bytes = concat_messages(&[first, second.clone()]);
    bytes.truncate(bytes.len() - second.len() / 2);

    let (parsed, error) = reader(bytes).read_all();
    assert_eq!(parsed.len(), 1);
    assert!(matches!(error, Some(Grib2Error::Truncated { .. })));
}

/// Byte offset of section `number` within one message.
fn section_offset(message: &[u8], number: u8) -> usize {
    let mut offset = 16;
    while message[offset + 4] != number {
        offset += u32::from_be_bytes(message[offset..offset + 4].try_into().unwrap()) as usize;
    }
    offset
}

fn set_section_length(message: &mut [u8], number: u8, length: u32) {
    let offset = section_offset(message, number);
    message[offset..offset + 4].copy_from_slice(&length.to_be_bytes());
}

#[test]
fn test_grid_section_shorter_than_header_is_rejected() {
    let mut bytes = NdfdMessageBuilder::new_tmax().build();
    set_section_length(&mut bytes, 3, 13);

    let result = reader(bytes).next_message();
    assert!(matches!(
        result,
        Err(Grib2Error::InvalidSection { section: 3, .. })
    ));
}

#[test]
fn test_bitmap_section_without_indicator_payload_is_rejected() {
    let data = create_grid_with_nans(4, 3, 12.5, &[(0, 0)]);
    let mut bytes = NdfdMessageBuilder::new_wind().with_data(data).build();
    set_section_length(&mut bytes, 6, 5);

    let result = reader(bytes).next_message();
    assert!(matches!(
        result,
        Err(Grib2Error::InvalidSection { section: 6, .. })
    ));
}

#[test]
fn test_corrupt_section_lengths_never_panic() {
    let template = NdfdMessageBuilder::new_wind()
        .with_data(create_grid_with_nans(4, 3, 12.5, &[(1, 1)]))
        .build();
    for number in 3..=7u8 {
        for length in 5..16 {
            let mut bytes = template.clone();
            set_section_length(&mut bytes, number, length);
            let (parsed, _) = reader(bytes).read_all();
            for message in parsed {
                let _ = message.unpack_data();
            }
        }
    }
}

#[test]
fn test_operational_maxt_file() {
    let path = require_test_file!("ds.maxt.bin");
    let bytes = std::fs::read(path).unwrap();

    let (parsed, _) = reader(bytes).read_all();
    assert!(!parsed.is_empty());
    for message in &parsed {
        assert_eq!(message.parameter(), "TMAX");
        assert_eq!(
            message.grid_dims(),
            (alaska::NY as usize, alaska::NX as usize)
        );
    }
}
