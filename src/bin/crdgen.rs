use kube::CustomResourceExt;
use simple_operator::crd::SimpleOperator;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&SimpleOperator::crd())?);
    Ok(())
}
