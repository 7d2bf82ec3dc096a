use rand::SeedableRng;
use rand::rngs::StdRng;
use tensor_engine::*;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn broadcast_add_of_image_planes() -> Result<()> {
    init_tracing();
    let channels = DenseTensor::<f32>::ones(&[16, 1, 1]);
    let plane = DenseTensor::<f32>::ones(&[1, 1, 28, 28]);

    assert_eq!(
        broadcast_shape(channels.dims(), plane.dims()).as_deref(),
        Some(&[1, 16, 28, 28][..])
    );
    let sum = channels.add(&plane)?;
    assert_eq!(sum.dims(), &[1, 16, 28, 28]);
    assert!(sum.elements().all(|&v| v == 2.0));
    Ok(())
}

#[test]
fn incompatible_shapes_do_not_broadcast() {
    assert_eq!(broadcast_shape(&[2, 3], &[4, 3]), None);
    let lhs = DenseTensor::<i32>::ones(&[2, 3]);
    let rhs = DenseTensor::<i32>::ones(&[4, 3]);
    assert!(matches!(lhs.add(&rhs), Err(TensorError::IncompatibleShapes { .. })));
}

#[test]
fn slicing_a_reshaped_range() -> Result<()> {
    let tensor = DenseTensor::<i32>::arange(0, 12, 1)?.reshape(&[3, 4])?;
    let view = tensor.slice_str(":,2:4")?;
    assert_eq!(view.dims(), &[3, 2]);
    assert_eq!(view.len(), 6);
    assert_eq!(view.get(&[2, 1])?, &11);
    assert_eq!(view.elements().copied().collect::<Vec<_>>(), vec![2, 3, 6, 7, 10, 11]);

    let nested = view.slice_str("1:,::-1")?;
    assert_eq!(nested.elements().copied().collect::<Vec<_>>(), vec![7, 6, 11, 10]);
    Ok(())
}

#[test]
fn reshape_rejects_wrong_element_count() -> Result<()> {
    let tensor = DenseTensor::<i32>::arange(0, 24, 1)?.reshape(&[2, 3, 4])?;
    assert!(matches!(
        tensor.reshape(&[5, 5]),
        Err(TensorError::ReshapeLength { actual: 24, .. })
    ));
    Ok(())
}

#[test]
fn negative_step_reverses_axis() -> Result<()> {
    let tensor = DenseTensor::<i32>::arange(0, 5, 1)?;
    let reversed = tensor.slice(s![step!(.., -1)])?;
    assert_eq!(reversed.elements().copied().collect::<Vec<_>>(), vec![4, 3, 2, 1, 0]);

    let every_other = tensor.slice_str("::-2")?;
    assert_eq!(every_other.elements().copied().collect::<Vec<_>>(), vec![4, 2, 0]);
    Ok(())
}

#[test]
fn all_matmul_tiers_agree() -> Result<()> {
    init_tracing();
    let mut rng = StdRng::seed_from_u64(42);
    let a = DenseTensor::<f32>::rand_with(&mut rng, &[384, 384]);
    let b = DenseTensor::<f32>::rand_with(&mut rng, &[384, 384]);

    let reference = matmul_2d_with(&a, &b, MatMulKernel::Managed)?;
    for kernel in MatMulKernel::ALL {
        let product = matmul_2d_with(&a, &b, kernel)?;
        assert_eq!(product.dims(), &[384, 384]);
        for (x, y) in product.elements().zip(reference.elements()) {
            assert!((x - y).abs() <= 1e-4 * y.abs().max(1.0), "{kernel:?}: {x} vs {y}");
        }
    }
    Ok(())
}

#[test]
fn valid_convolution_sums_windows() -> Result<()> {
    let image = DenseTensor::<f32>::arange(0.0, 25.0, 1.0)?.reshape(&[1, 1, 5, 5])?;
    let kernel = DenseTensor::<f32>::ones(&[1, 1, 3, 3]);
    let output = conv2d(&image, &kernel, None, &Conv2dParams::default())?;
    assert_eq!(output.dims(), &[1, 1, 3, 3]);
    assert_eq!(output.get(&[0, 0, 0, 0])?, &54.0);
    assert_eq!(output.get(&[0, 0, 2, 2])?, &162.0);
    Ok(())
}

#[test]
fn dynamic_tensors_by_name() -> Result<()> {
    let mut tensors = TensorMap::new();
    tensors.insert(
        "weights".to_string(),
        AnyTensor::from(DenseTensor::<f32>::arange(0.0, 6.0, 1.0)?.reshape(&[2, 3])?),
    );
    tensors.insert("ids".to_string(), AnyTensor::from(DenseTensor::from(vec![1i64, 2, 3])));

    let weights = &tensors["weights"];
    assert_eq!(weights.describe("weights"), "weights:float:2x3");
    let as_double = weights.cast_to(ElementType::Double)?;
    assert_eq!(as_double.element_type(), ElementType::Double);

    assert!(weights.add(&tensors["ids"]).is_err());
    Ok(())
}

#[test]
fn printing_views() -> Result<()> {
    let tensor = DenseTensor::<i32>::arange(0, 4, 1)?.reshape(&[2, 2])?;
    assert_eq!(tensor.print_shape(), "[2,2]");
    assert_eq!(tensor.slice_str("::-1")?.print_data(false), "[[2,3],[0,1]]");
    Ok(())
}
