use insta::assert_snapshot;
use recast::{
    CastError, CastErrorKind, CastSetter, Context, CustomShape, Reflect, Result, Shape, Value,
    record, to_string, try_cast, try_to_number, value,
};
use recast_testhelpers::test;

/// Temperature written as `"21.5C"`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Celsius(f64);

impl CastSetter for Celsius {
    fn cast_set(&mut self, _cx: &Context, value: &Value) -> Result<()> {
        let text = to_string(value);
        let Some(number) = text.strip_suffix('C') else {
            return Err(CastError::new(CastErrorKind::InvalidParams)
                .with_detail(format!("{text:?} has no unit")));
        };
        self.0 = try_to_number(&Value::from(number.trim()))?;
        Ok(())
    }
}

impl Reflect for Celsius {
    fn shape() -> Shape {
        Shape::Custom(CustomShape::of::<Celsius>("Celsius", f64::shape))
    }

    fn to_value(&self) -> Value {
        Value::F64(self.0)
    }

    fn from_value(value: Value) -> Result<Self> {
        try_to_number(&value).map(Celsius)
    }
}

record! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Reading {
        pub sensor: String,
        pub temp: Celsius,
    }
}

record! {
    #[derive(Debug, Default, PartialEq)]
    pub struct Endpoint {
        pub host: String,
        pub port: u16,
    }
}

fn parse_endpoint(cx: &Context, value: &Value) -> Result<Value> {
    let Some((host, port)) = value.as_str().and_then(|text| text.split_once(':')) else {
        return Err(
            CastError::new(CastErrorKind::UnsupportedSourceType).with_detail("expected host:port")
        );
    };
    let endpoint = Endpoint {
        host: host.to_owned(),
        port: cx.cast_into(&Value::from(port))?,
    };
    Ok(endpoint.to_value())
}

fn endpoint_spec() -> Shape {
    Shape::Custom(CustomShape::from_fn("EndpointSpec", Endpoint::shape, parse_endpoint))
}

#[test]
fn setter_takes_priority_over_coercion() {
    let reading: Reading = try_cast(&value!({"sensor": "attic", "temp": "21.5C"}), &[]).unwrap();
    assert_eq!(
        reading,
        Reading {
            sensor: "attic".into(),
            temp: Celsius(21.5),
        }
    );
}

#[test]
fn setter_errors_propagate_with_path() {
    let err = try_cast::<Reading>(&value!({"temp": "21.5"}), &[]).unwrap_err();
    assert!(err.is(CastErrorKind::InvalidParams));
    assert_snapshot!(err.to_string(), @r#"at temp: invalid params: "21.5" has no unit"#);
}

#[test]
fn setters_apply_to_list_elements() {
    let temps: Vec<Celsius> = try_cast(&value!(["1C", "2.5C", null]), &[]).unwrap();
    assert_eq!(temps, [Celsius(1.0), Celsius(2.5), Celsius(0.0)]);

    let err = try_cast::<Vec<Celsius>>(&value!(["1C", "2"]), &[]).unwrap_err();
    assert_snapshot!(err.to_string(), @r#"at [1]: invalid params: "2" has no unit"#);
}

#[test]
fn null_source_skips_the_setter() {
    let reading: Reading = try_cast(&value!({"sensor": "attic", "temp": null}), &[]).unwrap();
    assert_eq!(reading.temp, Celsius(0.0));
}

#[test]
fn struct_backed_setter_falls_back_to_field_matching() {
    let cx = Context::new();

    let parsed = cx.cast(&value!("db:5432"), &endpoint_spec()).unwrap();
    let parsed = Endpoint::from_value(parsed).unwrap();
    assert_eq!(
        parsed,
        Endpoint {
            host: "db".into(),
            port: 5432,
        }
    );

    let matched = cx.cast(&value!({"host": "cache", "port": "6379"}), &endpoint_spec()).unwrap();
    let matched = Endpoint::from_value(matched).unwrap();
    assert_eq!(
        matched,
        Endpoint {
            host: "cache".into(),
            port: 6379,
        }
    );
}

#[test]
fn fallback_still_reports_unusable_sources() {
    let err = Context::new().cast(&value!(17), &endpoint_spec()).unwrap_err();
    assert!(err.is(CastErrorKind::UnsupportedSourceType));
}
