use std::{env, path::PathBuf};

use anyhow::{Context, Result, anyhow};
use log::info;

use classifier::{
    arch::{Model, activations::ActFn, loss::CrossEntropy, mlp},
    checkpoint,
    config::TrainingConfig,
    dataset::{self, argmax, class_name},
    export::{self, INPUT_NAME},
    inference::Session,
    initialization::init_params_with,
    training::Trainer,
};

const DEFAULT_DATA_DIR: &str = "data/FashionMNIST/raw";
const DEFAULT_OUT_DIR: &str = ".";
const CHECKPOINT_FILE: &str = "model.safetensors";
const ARTIFACT_FILE: &str = "model.graph.safetensors";
const HIDDEN: usize = 512;

fn main() -> Result<()> {
    env_logger::init();

    let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    let out_dir =
        PathBuf::from(env::var("OUT_DIR").unwrap_or_else(|_| DEFAULT_OUT_DIR.to_string()));
    let config = match env::var("CONFIG") {
        Ok(path) => TrainingConfig::load(&path).with_context(|| format!("reading config {path}"))?,
        Err(_) => TrainingConfig::default(),
    };
    info!("training with {config:?}");

    let (mut train, test) = dataset::load_fashion_mnist(&data_dir)
        .with_context(|| format!("loading the dataset from {data_dir}"))?;

    let model = mlp(&[train.x_size(), HIDDEN, HIDDEN, train.y_size()], ActFn::relu());
    model.check_dims(test.x_size(), test.y_size())?;
    info!(params = model.size(); "built model with {} stages", model.layers().len());

    let params = init_params_with(&model, config.init, config.rng())?;
    let optimizer = config.build_optimizer(model.size());
    let mut trainer = Trainer::new(model, params, optimizer, CrossEntropy, &config)?;

    trainer.fit(&mut train, &test)?;
    println!("Done!");

    let (model, params) = trainer.into_parts();
    let checkpoint_path = out_dir.join(CHECKPOINT_FILE);
    checkpoint::save(&checkpoint_path, &model, &params)?;
    println!("Saved model state to {}", checkpoint_path.display());

    let fresh = mlp(&[test.x_size(), HIDDEN, HIDDEN, test.y_size()], ActFn::relu());
    let loaded = checkpoint::load(&checkpoint_path, &fresh)?;

    let (x, y) = test
        .head(1)
        .filter(|(x, _)| x.nrows() == 1)
        .ok_or_else(|| anyhow!("the test split is empty"))?;
    let actual = class_name(argmax(y.row(0)));
    let pred = fresh.predict(&loaded, x)?;
    let predicted = class_name(argmax(pred.row(0)));
    println!("Predicted: \"{predicted}\", Actual: \"{actual}\"");

    let artifact_path = out_dir.join(ARTIFACT_FILE);
    export::export(&artifact_path, &fresh, &loaded, x)?;

    let session = Session::load(&artifact_path)?;
    let outputs = session.run(&[(INPUT_NAME, x)])?;
    let (_, y_pred) = outputs
        .first()
        .ok_or_else(|| anyhow!("the artifact produced no outputs"))?;
    let predicted = class_name(argmax(y_pred.row(0)));
    println!("Predicted: \"{predicted}\", Actual: \"{actual}\"");

    Ok(())
}
